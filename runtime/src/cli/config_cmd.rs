//! `urlsift config`: store API keys or show which are set.

use crate::cli::output::{self, Styled};
use crate::config::ApiKeys;
use anyhow::{Context, Result};
use clap::Args;

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// VirusTotal API key
    #[arg(long)]
    pub virustotal: Option<String>,

    /// urlscan.io API key
    #[arg(long)]
    pub urlscan: Option<String>,

    /// AlienVault OTX API key
    #[arg(long)]
    pub alienvault: Option<String>,

    /// GitHub token for code search
    #[arg(long)]
    pub github: Option<String>,
}

impl ConfigArgs {
    fn is_empty(&self) -> bool {
        self.virustotal.is_none()
            && self.urlscan.is_none()
            && self.alienvault.is_none()
            && self.github.is_none()
    }
}

/// Merge the given keys into `keys`. Returns the names that changed.
pub fn apply(keys: &mut ApiKeys, args: &ConfigArgs) -> Vec<&'static str> {
    let updates = [
        ("virustotal", &args.virustotal, &mut keys.virustotal),
        ("urlscan", &args.urlscan, &mut keys.urlscan),
        ("alienvault", &args.alienvault, &mut keys.alienvault),
        ("github", &args.github, &mut keys.github),
    ];
    let mut changed = Vec::new();
    for (name, new, slot) in updates {
        if let Some(value) = new {
            *slot = Some(value.trim().to_string());
            changed.push(name);
        }
    }
    changed
}

/// Show a key without giving it away.
pub fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub async fn run(args: ConfigArgs) -> Result<()> {
    let s = Styled::new();
    let path = ApiKeys::default_path()?;
    let mut keys = ApiKeys::load(&path).context("loading key store")?;

    if args.is_empty() {
        output::print_section(&s, &format!("API keys ({})", path.display()));
        for name in ["virustotal", "urlscan", "alienvault", "github"] {
            match keys.get(name) {
                Some(key) => output::print_check(s.ok_sym(), name, &s.dim(&mask(key))),
                None => output::print_check(s.info_sym(), name, "not set"),
            }
        }
        return Ok(());
    }

    let changed = apply(&mut keys, &args);
    keys.save(&path).context("saving key store")?;
    for name in changed {
        eprintln!("  {} Saved {name} key", s.ok_sym());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_only_touches_given_keys() {
        let mut keys = ApiKeys {
            github: Some("old".into()),
            urlscan: Some("keep".into()),
            ..Default::default()
        };
        let args = ConfigArgs {
            github: Some(" new \n".into()),
            virustotal: Some("vt".into()),
            ..Default::default()
        };

        let changed = apply(&mut keys, &args);
        assert_eq!(changed, vec!["virustotal", "github"]);
        assert_eq!(keys.get("github"), Some("new"));
        assert_eq!(keys.get("virustotal"), Some("vt"));
        assert_eq!(keys.get("urlscan"), Some("keep"));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("abc"), "***");
        assert_eq!(mask("0123456789abcdef"), "0123...cdef");
    }
}
