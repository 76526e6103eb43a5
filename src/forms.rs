use serde::Deserialize;

const MAX_TEXT_CHARS: usize = 5000;
const MAX_EMAIL_CHARS: usize = 254;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{0} is not valid")]
    Invalid(&'static str),
    #[error("{0} is too long")]
    TooLong(&'static str),
}

/// Review submission as posted from the detail page.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewForm {
    pub text: Option<String>,
    pub email: Option<String>,
    pub parent: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewReview {
    pub text: String,
    pub email: String,
    pub parent_id: Option<i32>,
}

impl ReviewForm {
    pub fn validate(self) -> Result<NewReview, FormError> {
        let text = required(self.text, "text")?;
        if text.chars().count() > MAX_TEXT_CHARS {
            return Err(FormError::TooLong("text"));
        }

        let email = required(self.email, "email")?;
        if email.chars().count() > MAX_EMAIL_CHARS {
            return Err(FormError::TooLong("email"));
        }
        if !looks_like_email(&email) {
            return Err(FormError::Invalid("email"));
        }

        let parent_id = match self.parent.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse().map_err(|_| FormError::Invalid("parent"))?),
        };

        Ok(NewReview { text, email, parent_id })
    }
}

/// Star vote as posted by the rating widget. `star` is a `stars.id`.
#[derive(Debug, Default, Deserialize)]
pub struct RatingForm {
    pub movie: Option<String>,
    pub star: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vote {
    pub movie_id: i32,
    pub star_id: i32,
}

impl RatingForm {
    pub fn validate(self) -> Result<Vote, FormError> {
        let movie_id = required(self.movie, "movie")?
            .parse()
            .map_err(|_| FormError::Invalid("movie"))?;
        let star_id = required(self.star, "star")?
            .parse()
            .map_err(|_| FormError::Invalid("star"))?;
        Ok(Vote { movie_id, star_id })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, FormError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(FormError::Missing(field)),
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(text: &str, email: &str, parent: Option<&str>) -> ReviewForm {
        ReviewForm {
            text: Some(text.to_string()),
            email: Some(email.to_string()),
            parent: parent.map(str::to_string),
        }
    }

    #[test]
    fn accepts_plain_review() {
        let ok = review("Loved it", "neo@zion.org", None).validate().unwrap();
        assert_eq!(ok.text, "Loved it");
        assert_eq!(ok.parent_id, None);
    }

    #[test]
    fn empty_parent_means_top_level() {
        let ok = review("Same", "neo@zion.org", Some("")).validate().unwrap();
        assert_eq!(ok.parent_id, None);
    }

    #[test]
    fn parent_is_taken_as_given() {
        let ok = review("Reply", "neo@zion.org", Some("9999")).validate().unwrap();
        assert_eq!(ok.parent_id, Some(9999));
    }

    #[test]
    fn rejects_bad_reviews() {
        assert_eq!(review("  ", "a@b.c", None).validate(), Err(FormError::Missing("text")));
        assert_eq!(review("hi", "not-an-email", None).validate(), Err(FormError::Invalid("email")));
        assert_eq!(review("hi", "a@b", None).validate(), Err(FormError::Invalid("email")));
        assert_eq!(review("hi", "a@b.c", Some("x")).validate(), Err(FormError::Invalid("parent")));
        let long = "x".repeat(MAX_TEXT_CHARS + 1);
        assert_eq!(review(&long, "a@b.c", None).validate(), Err(FormError::TooLong("text")));
        assert_eq!(ReviewForm::default().validate(), Err(FormError::Missing("text")));
    }

    #[test]
    fn rating_needs_both_numbers() {
        let vote = RatingForm { movie: Some("3".into()), star: Some("5".into()) }.validate();
        assert_eq!(vote, Ok(Vote { movie_id: 3, star_id: 5 }));

        let missing = RatingForm { movie: Some("3".into()), star: None }.validate();
        assert_eq!(missing, Err(FormError::Missing("star")));

        let garbage = RatingForm { movie: Some("three".into()), star: Some("5".into()) }.validate();
        assert_eq!(garbage, Err(FormError::Invalid("movie")));
    }
}
