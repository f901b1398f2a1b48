//! LOCATE side effect: hand the user's friends a way to find them.

use tracing::{info, warn};

use crate::error::Result;
use crate::storage::config::LocateConfig;

/// Fired once each time the monitor enters LOCATE.
pub trait LocateNotifier: Send + Sync {
    fn notify(&self) -> Result<()>;
}

/// Opens a URL with whatever the platform registers for it.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that(url)
    }
}

/// Opens the location app's deep link, falling back to its website when
/// the app is not installed.
#[derive(Debug, Clone)]
pub struct DeepLinkNotifier<O = SystemOpener> {
    app_uri: String,
    web_fallback_url: String,
    opener: O,
}

impl DeepLinkNotifier<SystemOpener> {
    pub fn from_config(config: &LocateConfig) -> Self {
        Self::with_opener(&config.app_uri, &config.web_fallback_url, SystemOpener)
    }
}

impl<O: UrlOpener> DeepLinkNotifier<O> {
    pub fn with_opener(app_uri: &str, web_fallback_url: &str, opener: O) -> Self {
        Self {
            app_uri: app_uri.to_string(),
            web_fallback_url: web_fallback_url.to_string(),
            opener,
        }
    }

    /// Open the locator and return the URL that worked.
    pub fn open_locator(&self) -> Result<&str> {
        match self.opener.open(&self.app_uri) {
            Ok(()) => {
                info!(url = %self.app_uri, "opened location app");
                Ok(&self.app_uri)
            }
            Err(err) => {
                warn!(%err, url = %self.app_uri, "deep link failed, trying web fallback");
                self.opener.open(&self.web_fallback_url)?;
                info!(url = %self.web_fallback_url, "opened location website");
                Ok(&self.web_fallback_url)
            }
        }
    }
}

impl<O: UrlOpener> LocateNotifier for DeepLinkNotifier<O> {
    fn notify(&self) -> Result<()> {
        self.open_locator().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingOpener {
        refuse: Vec<&'static str>,
        opened: Mutex<Vec<String>>,
    }

    impl UrlOpener for RecordingOpener {
        fn open(&self, url: &str) -> std::io::Result<()> {
            self.opened.lock().unwrap().push(url.to_string());
            if self.refuse.iter().any(|refused| *refused == url) {
                return Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no handler"));
            }
            Ok(())
        }
    }

    #[test]
    fn prefers_deep_link() {
        let notifier = DeepLinkNotifier::with_opener(
            "life360://",
            "https://www.life360.com/",
            RecordingOpener::default(),
        );
        assert_eq!(notifier.open_locator().unwrap(), "life360://");
        assert_eq!(*notifier.opener.opened.lock().unwrap(), vec!["life360://"]);
    }

    #[test]
    fn falls_back_to_website() {
        let opener = RecordingOpener {
            refuse: vec!["life360://"],
            ..RecordingOpener::default()
        };
        let notifier = DeepLinkNotifier::with_opener("life360://", "https://www.life360.com/", opener);
        assert_eq!(notifier.open_locator().unwrap(), "https://www.life360.com/");
        assert_eq!(notifier.opener.opened.lock().unwrap().len(), 2);
    }

    #[test]
    fn both_failing_is_an_error() {
        let opener = RecordingOpener {
            refuse: vec!["life360://", "https://www.life360.com/"],
            ..RecordingOpener::default()
        };
        let notifier = DeepLinkNotifier::with_opener("life360://", "https://www.life360.com/", opener);
        assert!(notifier.notify().is_err());
    }
}
