use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketRegime {
    #[serde(rename = "Risk On")]
    RiskOn,
    #[serde(rename = "Risk Off")]
    RiskOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Offensive,
    Defensive,
}

impl MarketRegime {
    pub fn from_risk_on(risk_on: bool) -> Self {
        if risk_on {
            MarketRegime::RiskOn
        } else {
            MarketRegime::RiskOff
        }
    }

    pub fn is_risk_on(self) -> bool {
        matches!(self, MarketRegime::RiskOn)
    }

    pub fn action(self) -> Action {
        match self {
            MarketRegime::RiskOn => Action::Offensive,
            MarketRegime::RiskOff => Action::Defensive,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MarketRegime::RiskOn => "Risk On",
            MarketRegime::RiskOff => "Risk Off",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Risk On" => Some(MarketRegime::RiskOn),
            "Risk Off" => Some(MarketRegime::RiskOff),
            _ => None,
        }
    }
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Offensive => "Offensive",
            Action::Defensive => "Defensive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Offensive" => Some(Action::Offensive),
            "Defensive" => Some(Action::Defensive),
            _ => None,
        }
    }
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regime_maps_one_to_one_onto_action() {
        assert_eq!(MarketRegime::from_risk_on(true).action(), Action::Offensive);
        assert_eq!(MarketRegime::from_risk_on(false).action(), Action::Defensive);
    }

    #[test]
    fn labels_parse_back() {
        for regime in [MarketRegime::RiskOn, MarketRegime::RiskOff] {
            assert_eq!(MarketRegime::parse(regime.as_str()), Some(regime));
            let action = regime.action();
            assert_eq!(Action::parse(action.as_str()), Some(action));
        }
        assert_eq!(MarketRegime::parse("risk_off"), None);
        assert_eq!(Action::parse("Neutral"), None);
    }

    #[test]
    fn serializes_with_display_labels() {
        let v = serde_json::to_value(MarketRegime::RiskOff).unwrap();
        assert_eq!(v, serde_json::json!("Risk Off"));
    }
}
