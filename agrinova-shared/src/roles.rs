use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account role inside an organization. Stored verbatim ("Manager" / "Farmer")
/// in the `profiles` collection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    Manager,
    Farmer,
}

impl Default for Role {
    fn default() -> Self {
        Role::Farmer
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "Manager",
            Role::Farmer => "Farmer",
        }
    }

    pub fn is_manager(&self) -> bool {
        matches!(self, Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manager" => Ok(Role::Manager),
            "farmer" => Ok(Role::Farmer),
            _ => Err(format!("Invalid role: {}. Choose from manager, farmer", s)),
        }
    }
}
