// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::provider::Credentials;

/// API credentials pulled from the environment
///
/// Every key is optional; an unset or empty variable reads as `None`.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub listen_notes_api_key: Option<String>,
    pub podcast_index_key: Option<String>,
    pub podcast_index_secret: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            listen_notes_api_key: env_var("LISTEN_NOTES_API_KEY"),
            podcast_index_key: env_var("PODCAST_INDEX_API_KEY"),
            podcast_index_secret: env_var("PODCAST_INDEX_API_SECRET"),
        }
    }

    /// Podcast Index needs both halves of the credential pair
    pub fn podcast_index_credentials(&self) -> Option<Credentials> {
        match (&self.podcast_index_key, &self.podcast_index_secret) {
            (Some(key), Some(secret)) => Some(Credentials {
                key: key.clone(),
                secret: secret.clone(),
            }),
            _ => None,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Which catalog backend to start with
///
/// Podcast Index wins when its credential pair is present; otherwise the
/// bundled demo catalog serves everything offline. The Listen Notes
/// client stays available to embedders but is not part of this
/// selection.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderSelection {
    PodcastIndex(Credentials),
    Demo,
}

impl ProviderSelection {
    pub fn from_secrets(secrets: &Secrets) -> Self {
        match secrets.podcast_index_credentials() {
            Some(credentials) => Self::PodcastIndex(credentials),
            None => Self::Demo,
        }
    }
}
