//! Device/browser/OS classification of `User-Agent` headers for the search log,
//! backed by the ua-parser community regexes.

use once_cell::sync::Lazy;
use uaparser::{Parser, UserAgentParser};

use crate::domain::search::ClientInfo;

static UA_REGEXES: &[u8] = include_bytes!("../data/uap_regexes.yaml");

static UA_PARSER: Lazy<Option<UserAgentParser>> = Lazy::new(|| {
    match UserAgentParser::from_bytes(UA_REGEXES) {
        Ok(parser) => Some(parser),
        Err(err) => {
            tracing::error!(error = %err, "user agent regexes failed to load; clients will be logged as Unknown");
            None
        }
    }
});

impl ClientInfo {
    pub fn from_user_agent(user_agent: Option<&str>) -> Self {
        let Some(ua) = user_agent.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::unknown();
        };
        let Some(parser) = UA_PARSER.as_ref() else {
            return Self::unknown();
        };

        let client = parser.parse(ua);
        Self {
            device: client.device.family.into_owned(),
            family: client.user_agent.family.into_owned(),
            family_version: joined_version([
                client.user_agent.major.as_deref(),
                client.user_agent.minor.as_deref(),
                client.user_agent.patch.as_deref(),
            ]),
            os: client.os.family.into_owned(),
            os_version: joined_version([
                client.os.major.as_deref(),
                client.os.minor.as_deref(),
                client.os.patch.as_deref(),
            ]),
        }
    }
}

/// `major_minor_patch` from the leading components that are present.
fn joined_version(parts: [Option<&str>; 3]) -> String {
    parts
        .into_iter()
        .map_while(|part| part.filter(|p| !p.is_empty()))
        .collect::<Vec<_>>()
        .join("_")
}
