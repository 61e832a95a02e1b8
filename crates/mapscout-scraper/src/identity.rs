//! Rotating client identities for outbound search requests.

use rand::seq::IndexedRandom;

/// One coherent set of browser-like request headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIdentity {
    pub user_agent: &'static str,
    pub accept_language: &'static str,
    pub accept: &'static str,
}

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

const BUILTIN_IDENTITIES: &[ClientIdentity] = &[
    ClientIdentity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        accept_language: "en-US,en;q=0.9",
        accept: ACCEPT_HTML,
    },
    ClientIdentity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
        accept_language: "en-GB,en;q=0.9",
        accept: ACCEPT_HTML,
    },
    ClientIdentity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
        accept_language: "en-US,en;q=0.5",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    },
    ClientIdentity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:132.0) Gecko/20100101 Firefox/132.0",
        accept_language: "en-US,en;q=0.7,fr;q=0.3",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    },
    ClientIdentity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
        accept_language: "en-US,en;q=0.9",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    },
    ClientIdentity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
        accept_language: "en-US,en;q=0.9,de;q=0.6",
        accept: ACCEPT_HTML,
    },
];

/// A fixed pool of identities; each call to [`IdentityPool::pick`] draws
/// one uniformly at random.
#[derive(Debug, Clone)]
pub struct IdentityPool {
    identities: Vec<ClientIdentity>,
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self {
            identities: BUILTIN_IDENTITIES.to_vec(),
        }
    }
}

impl IdentityPool {
    /// A pool over `identities`, or the built-in set when `identities` is empty.
    #[must_use]
    pub fn new(identities: Vec<ClientIdentity>) -> Self {
        if identities.is_empty() {
            Self::default()
        } else {
            Self { identities }
        }
    }

    #[must_use]
    pub fn pick(&self) -> ClientIdentity {
        // The pool is never empty, see `new`.
        self.identities
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(BUILTIN_IDENTITIES[0])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
