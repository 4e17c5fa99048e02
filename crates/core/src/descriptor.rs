//! Static description of the SCM type for host configuration screens.

use serde::Serialize;

/// Registry key of the shell script SCM.
pub const SHELL_SCRIPT_TYPE_NAME: &str = "shell_script";

/// Human-readable name shown by the host.
pub const SHELL_SCRIPT_DISPLAY_NAME: &str = "Shell Script";

/// Input widget kind of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Boolean,
}

/// One configurable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    /// Key in the persisted configuration.
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

/// Describes an SCM type: what it is called and what it needs configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScmDescriptor {
    pub type_name: &'static str,
    pub display_name: &'static str,
    pub fields: Vec<FieldDescriptor>,
}

/// Descriptor of [`crate::scm::ShellScriptScm`].
pub fn shell_script_descriptor() -> ScmDescriptor {
    ScmDescriptor {
        type_name: SHELL_SCRIPT_TYPE_NAME,
        display_name: SHELL_SCRIPT_DISPLAY_NAME,
        fields: vec![
            FieldDescriptor {
                name: "checkout_script",
                label: "Checkout script",
                kind: FieldKind::Text,
            },
            FieldDescriptor {
                name: "polling_script",
                label: "Polling script",
                kind: FieldKind::Text,
            },
            FieldDescriptor {
                name: "use_checkout_for_polling",
                label: "Use checkout script for polling",
                kind: FieldKind::Boolean,
            },
        ],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
