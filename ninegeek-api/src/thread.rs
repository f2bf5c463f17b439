use bolero::generator::TypeGenerator;
use std::{fmt, str::FromStr};

use crate::{Comment, Error};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct ThreadId(pub i64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ThreadId {
    type Err = Error;

    fn from_str(s: &str) -> Result<ThreadId, Error> {
        s.parse().map(ThreadId).map_err(|_| Error::InvalidThreadId)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Thread {
    pub id: ThreadId,
    pub title: String,
    pub content: String,
    pub author: String,

    /// Comments in creation order. Left empty when listing all threads.
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Clone, Debug, bolero::generator::TypeGenerator, serde::Deserialize, serde::Serialize)]
pub struct NewThread {
    pub title: String,
    pub content: String,

    #[serde(default)]
    pub author: String,
}

impl NewThread {
    pub fn new(title: String, content: String, author: String) -> NewThread {
        NewThread {
            title,
            content,
            author,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if crate::validate_required_string(&self.title)
            && crate::validate_required_string(&self.content)
            && crate::validate_string(&self.author)
        {
            Ok(())
        } else {
            Err(Error::InvalidInput)
        }
    }

    pub fn into_thread(self, id: ThreadId) -> Thread {
        Thread {
            id,
            title: self.title,
            content: self.content,
            author: self.author,
            comments: Vec::new(),
        }
    }
}
