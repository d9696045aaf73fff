use super::dedup;
use crate::model::{Ecosystem, InstalledPackage};
use anyhow::Result;
use async_trait::async_trait;

/// Parses `dpkg -l` output.
///
/// Only rows in state `ii` (desired install, actually installed) count.
pub struct DpkgScanner;

#[async_trait]
impl super::Scanner for DpkgScanner {
    fn name(&self) -> &'static str {
        "dpkg packages"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Debian
    }

    fn parse(&self, listing: &str) -> Result<Vec<InstalledPackage>> {
        let packages = listing
            .lines()
            .filter_map(|line| {
                let mut columns = line.split_whitespace();
                if columns.next()? != "ii" {
                    return None;
                }
                let name = columns.next()?;
                let version = columns.next()?;
                // Multi-arch names carry an `:arch` qualifier.
                let name = name.split(':').next().unwrap_or(name);
                Some(InstalledPackage::new(name, version))
            })
            .collect();

        Ok(dedup(packages))
    }
}

/// Maps `/etc/debian_version` contents to a release codename.
///
/// # Example
///
/// ```
/// use lagscan::scanner::release_codename;
///
/// assert_eq!(release_codename("9.4\n"), "stretch");
/// assert_eq!(release_codename("buster/sid"), "buster");
/// ```
pub fn release_codename(debian_version: &str) -> String {
    let raw = debian_version.trim();
    if let Some((codename, _)) = raw.split_once('/') {
        return codename.to_string();
    }

    let major = raw.split('.').next().unwrap_or(raw);
    let codename = match major {
        "6" => "squeeze",
        "7" => "wheezy",
        "8" => "jessie",
        "9" => "stretch",
        "10" => "buster",
        "11" => "bullseye",
        "12" => "bookworm",
        "13" => "trixie",
        _ => raw,
    };
    codename.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;

    const LISTING: &str = "\
Desired=Unknown/Install/Remove/Purge/Hold
| Status=Not/Inst/Conf-files/Unpacked/halF-conf/Half-inst/trig-aWait/Trig-pend
|/ Err?=(none)/Reinst-required (Status,Err: uppercase=bad)
||/ Name                    Version              Architecture Description
+++-=======================-====================-============-==============================
ii  adduser                 3.115                all          add and remove users and groups
ii  libssl1.1:amd64         1.1.0f-3+deb9u2      amd64        Secure Sockets Layer toolkit
rc  libgcrypt11:amd64       1.5.0-5+deb7u6       amd64        LGPL Crypto library
ii  zlib1g:amd64            1:1.2.8.dfsg-5       amd64        compression library - runtime
ii  zlib1g:i386             1:1.2.8.dfsg-5       i386         compression library - runtime
";

    #[test]
    fn test_parse_dpkg_listing() {
        let packages = DpkgScanner.parse(LISTING).unwrap();
        assert_eq!(
            packages,
            vec![
                InstalledPackage::new("adduser", "3.115"),
                InstalledPackage::new("libssl1.1", "1.1.0f-3+deb9u2"),
                InstalledPackage::new("zlib1g", "1:1.2.8.dfsg-5"),
            ]
        );
    }

    #[test]
    fn test_parse_truncated_rows() {
        let packages = DpkgScanner.parse("ii  lonely\nii\n\n").unwrap();
        assert!(packages.is_empty());
    }

    #[test]
    fn test_release_codename() {
        assert_eq!(release_codename("8.10"), "jessie");
        assert_eq!(release_codename("10.13"), "buster");
        assert_eq!(release_codename("12"), "bookworm");
        assert_eq!(release_codename("bullseye/sid\n"), "bullseye");
        assert_eq!(release_codename(" 5.0.10 "), "5.0.10");
    }
}
