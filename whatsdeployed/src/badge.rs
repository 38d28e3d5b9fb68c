//! shields.io badges linking back to a view.

use serde::Serialize;

/// A badge for a set of environments, and snippets for embedding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    /// Badge image.
    pub image_url: String,

    /// Alt text and title.
    pub alt: String,

    /// Where the badge links to.
    pub target: String,
}

impl Badge {
    /// A badge naming `environments` that links to `target`, usually the
    /// absolute short URL.
    pub fn new<'a>(environments: impl IntoIterator<Item = &'a str>, target: impl Into<String>) -> Self {
        let envs = environments
            .into_iter()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(",");

        Self {
            image_url: format!("https://img.shields.io/badge/whatsdeployed-{envs}-green.svg"),
            alt: format!("What's deployed on {envs}?"),
            target: target.into(),
        }
    }

    /// Markdown image link.
    pub fn markdown(&self) -> String {
        format!("[![{}]({})]({})", self.alt, self.image_url, self.target)
    }

    /// reStructuredText substitution.
    pub fn restructured_text(&self) -> String {
        format!(
            ".. |whatsdeployed| image:: {}\n    :target: {}",
            self.image_url, self.target
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippets() {
        let badge = Badge::new(["Prod", "Stage"], "https://whatsdeployed.io/s-abc");
        assert_eq!(
            badge.image_url,
            "https://img.shields.io/badge/whatsdeployed-prod,stage-green.svg"
        );
        assert_eq!(badge.alt, "What's deployed on prod,stage?");
        assert_eq!(
            badge.markdown(),
            "[![What's deployed on prod,stage?](https://img.shields.io/badge/whatsdeployed-prod,stage-green.svg)](https://whatsdeployed.io/s-abc)"
        );
        assert_eq!(
            badge.restructured_text(),
            ".. |whatsdeployed| image:: https://img.shields.io/badge/whatsdeployed-prod,stage-green.svg\n    :target: https://whatsdeployed.io/s-abc"
        );
    }
}
