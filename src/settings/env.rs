use std::collections::HashMap;

/// Where `${name}` references look once the settings themselves have no match.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// The live process environment, with the platform's own name matching.
    #[default]
    Process,
    /// A fixed snapshot; names match exactly.
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    pub fn fixed<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Fixed(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Looks up `name`, treating non-Unicode values as absent.
    pub fn get(&self, name: &str) -> Option<String> {
        match self {
            Self::Process => {
                if !is_valid_name(name) {
                    return None;
                }
                std::env::var(name).ok()
            }
            Self::Fixed(vars) => vars.get(name).cloned(),
        }
    }
}

// Names the OS cannot store; asking for them is never a match.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['=', '\0'])
}
