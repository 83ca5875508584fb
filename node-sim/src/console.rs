//! Operator input read from stdin, one line per action.
//!
//! ```text
//! net down
//! net up
//! global_cmd/status
//! sensor_cmd/01/get 02
//! sensor_cmd/01/cmd 0001
//! ```

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub(crate) enum ParseError {
    #[error("Empty line")]
    Empty,

    #[error("Hex payload has an odd number of digits")]
    OddLength,

    #[error("Invalid hex digit {0:?}")]
    InvalidDigit(char),

    #[error("Unknown network state {0:?}, expected \"up\" or \"down\"")]
    NetworkState(String),
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Action {
    Network(bool),
    Publish { topic: String, payload: Vec<u8> },
}

impl std::str::FromStr for Action {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let first = parts.next().ok_or(ParseError::Empty)?;
        let rest: String = parts.collect();

        if first == "net" {
            return match rest.as_str() {
                "up" => Ok(Action::Network(true)),
                "down" => Ok(Action::Network(false)),
                other => Err(ParseError::NetworkState(other.to_string())),
            };
        }

        Ok(Action::Publish {
            topic: first.to_string(),
            payload: decode_hex(&rest)?,
        })
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, ParseError> {
    let digits = s
        .chars()
        .map(|c| {
            c.to_digit(16)
                .map(|d| d as u8)
                .ok_or(ParseError::InvalidDigit(c))
        })
        .collect::<Result<Vec<u8>, _>>()?;

    if digits.len() % 2 != 0 {
        return Err(ParseError::OddLength);
    }

    Ok(digits.chunks(2).map(|pair| pair[0] << 4 | pair[1]).collect())
}
