// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Serve name and address resolution results below host/<name>/dns/.
// Author: Lukas Bower

//! DNS provider.
//!
//! Every file is a [`Fun`] keyed by the host component of its path. Lookups go
//! through a [`NameService`]; the production one wraps a blocking
//! `hickory-resolver` instance configured from the system resolver settings.
//! Any resolution failure reads as a missing file.

use std::io;
use std::net::IpAddr;
use std::sync::Arc;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveError;
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::Resolver;
use log::{debug, warn};
use nopfs_core::{Dir, File, Fun, NopError, NopResult};

use super::by_host_lookup;

/// Help text served as `dns/README.txt`.
pub const README: &str = "
Name and address resolution
===========================

This directory contains name service routines. Reading the files
results in name resolution using the server's resolver configuration,
usually /etc/hosts followed by DNS.

  - addr    Look up the IPv4/IPv6 address for a name
  - cname   Look up the canonical version of a name
  - name    Reverse look up of the name that corresponds to an
            address
  - mx      Look up the mail exchanger corresponding for a domain
  - ns      Look up the DNS servers for a domain
  - txt     Look up any text records for a name

";

/// Resolution backend queried by the DNS files.
pub trait NameService: Send + Sync {
    /// Addresses of `host`.
    fn addresses(&self, host: &str) -> NopResult<Vec<IpAddr>>;
    /// Canonical name of `host`.
    fn canonical_name(&self, host: &str) -> NopResult<String>;
    /// Names registered for `addr`.
    fn names(&self, addr: IpAddr) -> NopResult<Vec<String>>;
    /// Mail exchangers of `host` as (preference, exchange).
    fn mail_exchangers(&self, host: &str) -> NopResult<Vec<(u16, String)>>;
    /// Name servers of `host`.
    fn name_servers(&self, host: &str) -> NopResult<Vec<String>>;
    /// Text records of `host`.
    fn texts(&self, host: &str) -> NopResult<Vec<String>>;
}

/// [`NameService`] backed by the system resolver configuration.
pub struct HickoryService {
    resolver: Resolver,
}

impl HickoryService {
    /// Resolver built from `/etc/resolv.conf`, or the library defaults when the
    /// system configuration cannot be read.
    pub fn from_system() -> io::Result<Self> {
        let resolver = match Resolver::from_system_conf() {
            Ok(resolver) => resolver,
            Err(err) => {
                warn!(target: "nopfs", "dns: system resolver configuration unavailable: {err}");
                Resolver::new(ResolverConfig::default(), ResolverOpts::default())?
            }
        };
        Ok(Self { resolver })
    }
}

fn not_found(what: &str, host: &str, err: ResolveError) -> NopError {
    debug!(target: "nopfs", "dns: {what} {host}: {err}");
    NopError::NotFound
}

impl NameService for HickoryService {
    fn addresses(&self, host: &str) -> NopResult<Vec<IpAddr>> {
        let lookup = self
            .resolver
            .lookup_ip(host)
            .map_err(|err| not_found("addr", host, err))?;
        Ok(lookup.iter().collect())
    }

    fn canonical_name(&self, host: &str) -> NopResult<String> {
        match self.resolver.lookup(host, RecordType::CNAME) {
            Ok(lookup) => lookup
                .iter()
                .find_map(|rdata| match rdata {
                    RData::CNAME(name) => Some(name.to_string()),
                    _ => None,
                })
                .ok_or(NopError::NotFound),
            Err(err) => {
                // Hosts without an alias are their own canonical name.
                debug!(target: "nopfs", "dns: cname {host}: {err}");
                self.addresses(host)?;
                Ok(fully_qualified(host))
            }
        }
    }

    fn names(&self, addr: IpAddr) -> NopResult<Vec<String>> {
        let lookup = self
            .resolver
            .reverse_lookup(addr)
            .map_err(|err| not_found("name", &addr.to_string(), err))?;
        Ok(lookup.iter().map(ToString::to_string).collect())
    }

    fn mail_exchangers(&self, host: &str) -> NopResult<Vec<(u16, String)>> {
        let lookup = self
            .resolver
            .mx_lookup(host)
            .map_err(|err| not_found("mx", host, err))?;
        Ok(lookup
            .iter()
            .map(|mx| (mx.preference(), mx.exchange().to_string()))
            .collect())
    }

    fn name_servers(&self, host: &str) -> NopResult<Vec<String>> {
        let lookup = self
            .resolver
            .ns_lookup(host)
            .map_err(|err| not_found("ns", host, err))?;
        Ok(lookup.iter().map(ToString::to_string).collect())
    }

    fn texts(&self, host: &str) -> NopResult<Vec<String>> {
        let lookup = self
            .resolver
            .txt_lookup(host)
            .map_err(|err| not_found("txt", host, err))?;
        Ok(lookup
            .iter()
            .map(|txt| {
                txt.txt_data()
                    .iter()
                    .map(|chunk| String::from_utf8_lossy(chunk))
                    .collect::<String>()
            })
            .collect())
    }
}

fn fully_qualified(host: &str) -> String {
    if host.ends_with('.') {
        host.to_owned()
    } else {
        format!("{host}.")
    }
}

fn lines<I, S>(items: I) -> NopResult<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: std::fmt::Display,
{
    let mut out = String::new();
    for item in items {
        out.push_str(&format!("{item}\n"));
    }
    if out.is_empty() {
        return Err(NopError::NotFound);
    }
    Ok(out.into_bytes())
}

/// Content of `addr`.
pub fn addr(service: &dyn NameService, host: &str) -> NopResult<Vec<u8>> {
    lines(service.addresses(host)?)
}

/// Content of `cname`.
pub fn cname(service: &dyn NameService, host: &str) -> NopResult<Vec<u8>> {
    lines([service.canonical_name(host)?])
}

/// Content of `name`. The host component must be an address literal.
pub fn name(service: &dyn NameService, host: &str) -> NopResult<Vec<u8>> {
    let addr: IpAddr = host.parse().map_err(|_| NopError::NotFound)?;
    lines(service.names(addr)?)
}

/// Content of `mx`.
pub fn mx(service: &dyn NameService, host: &str) -> NopResult<Vec<u8>> {
    lines(
        service
            .mail_exchangers(host)?
            .into_iter()
            .map(|(preference, exchange)| format!("{preference} {exchange}")),
    )
}

/// Content of `ns`.
pub fn ns(service: &dyn NameService, host: &str) -> NopResult<Vec<u8>> {
    lines(service.name_servers(host)?)
}

/// Content of `txt`.
pub fn txt(service: &dyn NameService, host: &str) -> NopResult<Vec<u8>> {
    lines(service.texts(host)?)
}

type Formatter = fn(&dyn NameService, &str) -> NopResult<Vec<u8>>;

const FILES: [(&str, Formatter); 6] = [
    ("addr", addr),
    ("cname", cname),
    ("name", name),
    ("mx", mx),
    ("ns", ns),
    ("txt", txt),
];

/// Build the `dns/` directory template over `service`.
pub fn directory(service: Arc<dyn NameService>) -> Arc<Dir> {
    let dir = Dir::new();
    dir.append("README.txt", File::new(README));
    for (file, render) in FILES {
        let service = Arc::clone(&service);
        dir.append(
            file,
            Fun::new(by_host_lookup(move |host| render(service.as_ref(), host))),
        );
    }
    dir
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use nopfs_core::{Node, NodePath};

    use super::*;

    struct FixedZone;

    impl NameService for FixedZone {
        fn addresses(&self, host: &str) -> NopResult<Vec<IpAddr>> {
            match host {
                "example.org" => Ok(vec![
                    IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
                    "2001:db8::1".parse().unwrap(),
                ]),
                _ => Err(NopError::NotFound),
            }
        }

        fn canonical_name(&self, host: &str) -> NopResult<String> {
            self.addresses(host).map(|_| fully_qualified(host))
        }

        fn names(&self, addr: IpAddr) -> NopResult<Vec<String>> {
            if addr == IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)) {
                Ok(vec!["example.org.".to_owned()])
            } else {
                Err(NopError::NotFound)
            }
        }

        fn mail_exchangers(&self, _host: &str) -> NopResult<Vec<(u16, String)>> {
            Ok(vec![(10, "mx1.example.org.".to_owned()), (20, "mx2.example.org.".to_owned())])
        }

        fn name_servers(&self, _host: &str) -> NopResult<Vec<String>> {
            Ok(Vec::new())
        }

        fn texts(&self, _host: &str) -> NopResult<Vec<String>> {
            Ok(vec!["v=spf1 -all".to_owned()])
        }
    }

    #[test]
    fn records_are_formatted_one_per_line() {
        assert_eq!(
            addr(&FixedZone, "example.org").unwrap(),
            b"192.0.2.1\n2001:db8::1\n"
        );
        assert_eq!(cname(&FixedZone, "example.org").unwrap(), b"example.org.\n");
        assert_eq!(name(&FixedZone, "192.0.2.1").unwrap(), b"example.org.\n");
        assert_eq!(
            mx(&FixedZone, "example.org").unwrap(),
            b"10 mx1.example.org.\n20 mx2.example.org.\n"
        );
        assert_eq!(txt(&FixedZone, "example.org").unwrap(), b"v=spf1 -all\n");
    }

    #[test]
    fn lines_terminates_every_record_and_rejects_empty_answers() {
        assert_eq!(lines(["a", "b"]).unwrap(), b"a\nb\n");
        assert_eq!(lines(Vec::<String>::new()), Err(NopError::NotFound));
    }

    #[test]
    fn failures_read_as_missing() {
        assert_eq!(addr(&FixedZone, "nowhere.invalid"), Err(NopError::NotFound));
        assert_eq!(name(&FixedZone, "not-an-address"), Err(NopError::NotFound));
        assert_eq!(ns(&FixedZone, "example.org"), Err(NopError::NotFound));
    }

    #[test]
    fn directory_resolves_through_the_host_component() {
        let dir = directory(Arc::new(FixedZone));
        let mut names = dir.names();
        names.sort();
        assert_eq!(names, ["README.txt", "addr", "cname", "mx", "name", "ns", "txt"]);

        let mut handle = Arc::clone(&dir).walk("addr").unwrap();
        handle.set_path(NodePath::from_components(["host", "example.org", "dns", "addr"]));
        assert_eq!(&*handle.read().unwrap(), b"192.0.2.1\n2001:db8::1\n");
    }
}
