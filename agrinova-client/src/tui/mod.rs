//! Terminal rendering for the CLI.

use agrinova_shared::roles::Role;

pub mod farm;
pub mod session;
pub mod table;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";

pub fn dim(s: &str) -> String {
    format!("{DIM}{s}{RESET}")
}

pub fn bold(s: &str) -> String {
    format!("{BOLD}{s}{RESET}")
}

pub fn role_badge(role: Role) -> String {
    match role {
        Role::Manager => format!("{GREEN}{role}{RESET}"),
        Role::Farmer => format!("{CYAN}{role}{RESET}"),
    }
}
