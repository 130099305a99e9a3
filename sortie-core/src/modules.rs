//! Supported automation modules
//!
//! The allow-list of module names an execution request may invoke.

use serde::Serialize;

/// A module that may be invoked through an adhoc execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModuleInfo {
    pub name: &'static str,
    pub description: &'static str,
}

const fn module(name: &'static str, description: &'static str) -> ModuleInfo {
    ModuleInfo { name, description }
}

pub const SUPPORTED_MODULES: &[ModuleInfo] = &[
    module("shell", "Execute shell commands"),
    module("command", "Execute commands without shell"),
    module("copy", "Copy files to remote locations"),
    module("file", "Manage files and file properties"),
    module("service", "Manage services"),
    module("package", "Manage packages"),
    module("yum", "Manage packages with yum"),
    module("apt", "Manage packages with apt"),
    module("ping", "Test connection to hosts"),
    module("setup", "Gather facts about remote hosts"),
    module("debug", "Print statements during execution"),
    module("template", "Process Jinja2 templates"),
    module("lineinfile", "Manage lines in text files"),
    module("replace", "Replace text in files"),
    module("user", "Manage user accounts"),
    module("group", "Manage groups"),
    module("cron", "Manage cron entries"),
    module("mount", "Manage mounted filesystems"),
    module("git", "Deploy software from git repositories"),
];

/// Returns true if `name` is an allowed module (exact, case-sensitive match).
pub fn is_supported(name: &str) -> bool {
    SUPPORTED_MODULES.iter().any(|m| m.name == name)
}
