use bolero::generator::TypeGenerator;

use crate::Error;

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct CommentId(pub i64);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub author: String,
    pub content: String,
}

#[derive(Clone, Debug, bolero::generator::TypeGenerator, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub author: String,
    pub content: String,
}

impl NewComment {
    pub fn new(author: String, content: String) -> NewComment {
        NewComment { author, content }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if crate::validate_required_string(&self.author)
            && crate::validate_required_string(&self.content)
        {
            Ok(())
        } else {
            Err(Error::InvalidInput)
        }
    }

    pub fn into_comment(self, id: CommentId) -> Comment {
        Comment {
            id,
            author: self.author,
            content: self.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_is_required() {
        assert!(serde_json::from_str::<NewComment>(r#"{"content":"hi"}"#).is_err());
        let c = NewComment::new(String::new(), "hi".into());
        assert_eq!(c.validate(), Err(Error::InvalidInput));
    }

    #[test]
    fn valid_comment() {
        let c: NewComment = serde_json::from_str(r#"{"author":"B","content":"hi"}"#).unwrap();
        c.validate().unwrap();
        assert_eq!(
            serde_json::to_value(c.into_comment(CommentId(1))).unwrap(),
            serde_json::json!({"id": 1, "author": "B", "content": "hi"})
        );
    }
}
