//! Command-token classification: the process-wide descriptor table mapping
//! every recognized verb to whether it is open without authentication,
//! declined outright, or an alias of another verb.
//!
//! Grounded on the original's `commandsMap` (`client/commands.go`):
//! a flat table built once, rather than a chain of per-connection closures.
//! Generalizes the teacher's `CommandVariant`/`from_frame` match-based
//! dispatch (`cmd/mod.rs`) from three Redis verbs to the full FTP set.

/// Verbs open to a session before `USER`/`PASS` succeed.
const OPEN_WITHOUT_AUTH: &[&str] = &["USER", "PASS", "FEAT", "SYST", "NOOP", "OPTS", "QUIT"];

/// Recognized but intentionally declined verbs (reply 502). RFC 2228/2389
/// TLS negotiation and the handful of verbs spec.md's Non-goals name.
const DECLINED: &[&str] = &[
    "AUTH", "PROT", "PBSZ", "ACCT", "ADAT", "CCC", "CONF", "ENC", "EPRT", "HELP", "LANG", "MIC", "MLSD", "MLST",
    "MODE", "REIN", "SMNT", "STOU", "STRU", "SITE",
];

/// Verbs implemented by this server (after alias resolution). Anything not
/// in this list and not in `DECLINED` is `Command::Unknown`.
const IMPLEMENTED: &[&str] = &[
    "USER", "PASS", "FEAT", "SYST", "NOOP", "OPTS", "ABOR", "SIZE", "STAT", "MDTM", "RETR", "STOR", "APPE", "DELE",
    "RNFR", "RNTO", "ALLO", "REST", "CWD", "PWD", "CDUP", "NLST", "LIST", "MKD", "RMD", "TYPE", "PASV", "EPSV",
    "PORT", "QUIT",
];

/// Deprecated aliases, resolved to their canonical verb before dispatch.
/// `XCUP` aliases `CDUP` (not `CWD`) per this implementation's command
/// table, matching the XMKD/XRMD/XPWD aliasing pattern already in spec.md.
fn canonicalize(verb: &str) -> &str {
    match verb {
        "XMKD" => "MKD",
        "XRMD" => "RMD",
        "XPWD" => "PWD",
        "XCUP" => "CDUP",
        other => other,
    }
}

/// The outcome of looking a verb up in the command table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A recognized, implemented verb (canonical token) plus whether it may
    /// run before authentication.
    Known { verb: &'static str, open_without_auth: bool },
    /// Recognized but intentionally unimplemented (502).
    Declined(&'static str),
    /// Not recognized at all (500).
    Unknown,
}

impl Command {
    pub fn lookup(verb: &str) -> Command {
        let canonical = canonicalize(verb);
        if let Some(&token) = IMPLEMENTED.iter().find(|&&t| t == canonical) {
            return Command::Known {
                verb: token,
                open_without_auth: OPEN_WITHOUT_AUTH.contains(&token),
            };
        }
        if let Some(&token) = DECLINED.iter().find(|&&t| t == canonical) {
            return Command::Declined(token);
        }
        Command::Unknown
    }
}
