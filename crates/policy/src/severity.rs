use hypr_guard_core::{Action, Severity};

struct Rule {
    category: &'static str,
    /// `None` matches every action name in the category.
    names: Option<&'static [&'static str]>,
    severity: Severity,
}

const RULES: &[Rule] = &[
    Rule {
        category: "file",
        names: Some(&["delete", "format", "overwrite"]),
        severity: Severity::Critical,
    },
    Rule {
        category: "file",
        names: Some(&["move", "copy", "rename"]),
        severity: Severity::Medium,
    },
    Rule {
        category: "file",
        names: Some(&["read", "list", "search", "open"]),
        severity: Severity::Low,
    },
    Rule {
        category: "app",
        names: Some(&["launch", "focus", "list"]),
        severity: Severity::Low,
    },
    Rule {
        category: "app",
        names: Some(&["close", "kill"]),
        severity: Severity::Medium,
    },
    Rule {
        category: "system",
        names: Some(&["restart", "shutdown"]),
        severity: Severity::Critical,
    },
    Rule {
        category: "system",
        names: Some(&["volume", "brightness", "network"]),
        severity: Severity::Low,
    },
    Rule {
        category: "browser",
        names: None,
        severity: Severity::Low,
    },
    Rule {
        category: "keyboard",
        names: None,
        severity: Severity::Medium,
    },
    Rule {
        category: "mouse",
        names: None,
        severity: Severity::Medium,
    },
];

/// Tier for pairs absent from the table.
pub const DEFAULT_SEVERITY: Severity = Severity::Medium;

/// Maps a category/name pair to its trust tier. Case-insensitive.
pub fn classify(category: &str, name: &str) -> Severity {
    let category = category.to_lowercase();
    let name = name.to_lowercase();

    RULES
        .iter()
        .find(|rule| {
            rule.category == category
                && rule.names.map_or(true, |names| names.contains(&name.as_str()))
        })
        .map(|rule| rule.severity)
        .unwrap_or(DEFAULT_SEVERITY)
}

/// The action's own tier, or the classified one when it arrived untagged.
pub fn classify_action(action: &Action) -> Severity {
    action
        .severity
        .unwrap_or_else(|| classify(&action.category, &action.name))
}

pub fn with_classified_severity(mut action: Action) -> Action {
    if action.severity.is_none() {
        action.severity = Some(classify(&action.category, &action.name));
    }
    action
}
