//! Network selection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three Anchor Chain networks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    /// The production network.
    #[serde(rename = "main")]
    Main,
    /// The public test network.
    #[serde(rename = "test")]
    Test,
    /// Private regression-test networks: a single delegate, no peers
    /// required, blocks on demand.
    #[serde(rename = "regtest")]
    Regtest,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Main => "main",
            Network::Test => "test",
            Network::Regtest => "regtest",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Network::Main.to_string(), "main");
        assert_eq!(Network::Regtest.to_string(), "regtest");
    }
}
