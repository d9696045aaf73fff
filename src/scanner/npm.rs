use super::dedup;
use crate::model::{Ecosystem, InstalledPackage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Parses `npm ls -g` output, as a text tree or as JSON.
pub struct NpmScanner;

#[derive(Deserialize)]
struct NpmListOutput {
    #[serde(default)]
    dependencies: BTreeMap<String, NpmPackage>,
}

#[derive(Deserialize)]
struct NpmPackage {
    version: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, NpmPackage>,
}

fn flatten(dependencies: &BTreeMap<String, NpmPackage>, out: &mut Vec<InstalledPackage>) {
    for (name, package) in dependencies {
        if let Some(version) = &package.version {
            out.push(InstalledPackage::new(name, version));
        }
        flatten(&package.dependencies, out);
    }
}

/// Finds the `name@version` token on a tree line.
///
/// The search starts past the first character so scoped names such as
/// `@babel/core@7.0.0` split on their last `@`.
fn tree_entry(line: &str) -> Option<InstalledPackage> {
    line.split_whitespace().find_map(|token| {
        let at = token.rfind('@').filter(|&at| at > 0)?;
        let (name, version) = (&token[..at], &token[at + 1..]);
        if version.is_empty() {
            return None;
        }
        Some(InstalledPackage::new(name, version))
    })
}

#[async_trait]
impl super::Scanner for NpmScanner {
    fn name(&self) -> &'static str {
        "npm global packages"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn parse(&self, listing: &str) -> Result<Vec<InstalledPackage>> {
        let mut packages = Vec::new();

        if listing.trim_start().starts_with('{') {
            let output: NpmListOutput =
                serde_json::from_str(listing).context("Failed to parse npm list output")?;
            flatten(&output.dependencies, &mut packages);
        } else {
            packages.extend(listing.lines().filter_map(tree_entry));
        }

        Ok(dedup(packages))
    }
}
