use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// The integration methods available to [crate::solve()].
///
/// - [Algorithm::Tsit45]: Tsitouras 5(4) explicit Runge-Kutta method. Cheap per step, a good default for non-stiff problems.
/// - [Algorithm::Bdf]: variable order Backwards Difference Formulae, suitable for stiff problems.
/// - [Algorithm::TrBdf2]: a second order ESDIRK method (trapezoidal rule followed by a BDF2 stage).
/// - [Algorithm::Esdirk34]: a third order ESDIRK method with an embedded fourth order error estimate.
///
/// Names are parsed case-insensitively by [FromStr].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    #[default]
    Tsit45,
    Bdf,
    TrBdf2,
    Esdirk34,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Tsit45,
        Algorithm::Bdf,
        Algorithm::TrBdf2,
        Algorithm::Esdirk34,
    ];

    /// Canonical name, accepted by [FromStr]
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Tsit45 => "tsit45",
            Algorithm::Bdf => "bdf",
            Algorithm::TrBdf2 => "tr_bdf2",
            Algorithm::Esdirk34 => "esdirk34",
        }
    }

    /// Implicit methods solve a nonlinear system each step and use the Jacobian of the right-hand side.
    pub fn is_implicit(&self) -> bool {
        !matches!(self, Algorithm::Tsit45)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tsit45" | "tsit5" => Ok(Algorithm::Tsit45),
            "bdf" => Ok(Algorithm::Bdf),
            "tr_bdf2" | "trbdf2" => Ok(Algorithm::TrBdf2),
            "esdirk34" => Ok(Algorithm::Esdirk34),
            _ => Err(ConfigurationError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<String> for Algorithm {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Algorithm> for String {
    fn from(alg: Algorithm) -> Self {
        alg.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names_and_aliases() {
        assert_eq!("bdf".parse::<Algorithm>(), Ok(Algorithm::Bdf));
        assert_eq!("TR_BDF2".parse::<Algorithm>(), Ok(Algorithm::TrBdf2));
        assert_eq!("trbdf2".parse::<Algorithm>(), Ok(Algorithm::TrBdf2));
        assert_eq!(" Tsit5 ".parse::<Algorithm>(), Ok(Algorithm::Tsit45));
        assert_eq!("esdirk34".parse::<Algorithm>(), Ok(Algorithm::Esdirk34));
        for alg in Algorithm::ALL {
            assert_eq!(alg.name().parse::<Algorithm>(), Ok(alg));
        }
    }

    #[test]
    fn unknown_name_is_configuration_error() {
        assert_eq!(
            "Vern9".parse::<Algorithm>(),
            Err(ConfigurationError::UnknownAlgorithm("Vern9".to_string()))
        );
    }

    #[test]
    fn default_is_explicit() {
        assert_eq!(Algorithm::default(), Algorithm::Tsit45);
        assert!(!Algorithm::default().is_implicit());
        assert!(Algorithm::Bdf.is_implicit());
    }

    #[test]
    fn serde_uses_names() {
        let json = serde_json::to_string(&Algorithm::TrBdf2).unwrap();
        assert_eq!(json, "\"tr_bdf2\"");
        let alg: Algorithm = serde_json::from_str("\"Tsit5\"").unwrap();
        assert_eq!(alg, Algorithm::Tsit45);
        let err = serde_json::from_str::<Algorithm>("\"rk4\"").unwrap_err();
        assert!(err.to_string().contains("Unknown algorithm 'rk4'"));
    }
}
