//! Client profile supplied by the caller for each pipeline run

use serde::{Deserialize, Serialize};

/// Facts about the buyer. Every field is optional; components degrade to
/// generic behaviour when something is unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientProfile {
    pub age: Option<u32>,
    pub city: Option<String>,
    pub state: Option<String>,
    /// Monthly budget in BRL
    pub budget: Option<f64>,
    pub dependents: Vec<Dependent>,
    /// Pre-existing conditions
    pub conditions: Vec<String>,
    pub preferences: Vec<String>,
}

/// A person covered alongside the client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Dependent {
    pub age: Option<u32>,
    pub relationship: Option<String>,
}

impl ClientProfile {
    pub fn has_dependents(&self) -> bool {
        !self.dependents.is_empty()
    }

    /// Any dependent known to be under 18
    pub fn has_minor_dependents(&self) -> bool {
        self.dependents
            .iter()
            .any(|d| d.age.map(|a| a < 18).unwrap_or(false))
    }

    /// "City - ST", "City", "ST" or nothing
    pub fn location(&self) -> Option<String> {
        let city = self.city.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let state = self.state.as_deref().map(str::trim).filter(|s| !s.is_empty());
        match (city, state) {
            (Some(c), Some(s)) => Some(format!("{} - {}", c, s)),
            (Some(c), None) => Some(c.to_string()),
            (None, Some(s)) => Some(s.to_string()),
            (None, None) => None,
        }
    }

    /// Compact description embedded into LLM prompts
    pub fn prompt_summary(&self) -> String {
        let mut lines = Vec::new();
        if let Some(age) = self.age {
            lines.push(format!("- Idade: {} anos", age));
        }
        if let Some(location) = self.location() {
            lines.push(format!("- Localização: {}", location));
        }
        if let Some(budget) = self.budget {
            lines.push(format!("- Orçamento mensal: R$ {:.2}", budget));
        }
        if self.has_dependents() {
            let ages: Vec<String> = self
                .dependents
                .iter()
                .map(|d| match d.age {
                    Some(a) => format!("{} anos", a),
                    None => "idade não informada".to_string(),
                })
                .collect();
            lines.push(format!(
                "- Dependentes: {} ({})",
                self.dependents.len(),
                ages.join(", ")
            ));
        }
        if !self.conditions.is_empty() {
            lines.push(format!("- Condições de saúde: {}", self.conditions.join(", ")));
        }
        if !self.preferences.is_empty() {
            lines.push(format!("- Preferências: {}", self.preferences.join(", ")));
        }
        if lines.is_empty() {
            "- Perfil não informado".to_string()
        } else {
            lines.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_variants() {
        let mut profile = ClientProfile {
            city: Some("São Paulo".to_string()),
            state: Some("SP".to_string()),
            ..Default::default()
        };
        assert_eq!(profile.location().as_deref(), Some("São Paulo - SP"));

        profile.state = Some("  ".to_string());
        assert_eq!(profile.location().as_deref(), Some("São Paulo"));

        profile.city = None;
        assert_eq!(profile.location(), None);
    }

    #[test]
    fn test_minor_dependents() {
        let profile = ClientProfile {
            dependents: vec![
                Dependent {
                    age: Some(40),
                    relationship: Some("cônjuge".to_string()),
                },
                Dependent {
                    age: None,
                    relationship: None,
                },
            ],
            ..Default::default()
        };
        assert!(profile.has_dependents());
        assert!(!profile.has_minor_dependents());
    }

    #[test]
    fn test_deserialize_camel_case_partial() {
        let profile: ClientProfile =
            serde_json::from_str(r#"{"age": 35, "city": "Campinas", "dependents": [{"age": 4}]}"#)
                .unwrap();
        assert_eq!(profile.age, Some(35));
        assert!(profile.has_minor_dependents());
        assert!(profile.conditions.is_empty());
    }

    #[test]
    fn test_prompt_summary_empty_profile() {
        assert_eq!(ClientProfile::default().prompt_summary(), "- Perfil não informado");
    }
}
