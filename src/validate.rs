//! Form and payload validation.
//!
//! Length and email rules come from `validator` derives; the remaining rules
//! (blank text, username alphabet, password policy) are checked by hand and
//! merged into the same [`FieldErrors`] map so callers see one error shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::models::{Id, PostFields, UpdateUser};

pub const PASSWORD_MIN: usize = 8;

pub const REQUIRED: &str = "This field is required.";
/// Key for errors that belong to the form as a whole.
pub const NON_FIELD: &str = "__all__";

/// Field name → messages, ordered for stable output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut e = Self::default();
        e.add(field, message);
        e
    }

    fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::default();
        for (field, errs) in errors.field_errors() {
            for e in errs.iter() {
                let msg = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({}).", e.code));
                out.add(&field.to_string(), msg);
            }
        }
        out
    }
}

fn derive_errors(v: &impl Validate) -> FieldErrors {
    v.validate().err().map(FieldErrors::from).unwrap_or_default()
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Blank optional text is stored as absent.
fn optional(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Submitted post form; also the body of `PUT /api/posts/{id}/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct PostForm {
    #[serde(default)]
    #[validate(length(max = 200, message = "Ensure this value has at most 200 characters."))]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[validate(length(max = 100, message = "Ensure this value has at most 100 characters."))]
    pub category: Option<String>,
    #[validate(length(max = 100, message = "Ensure this value has at most 100 characters."))]
    pub image: Option<String>,
}

impl PostForm {
    pub fn clean(mut self) -> Result<PostFields, FieldErrors> {
        // limits apply to what gets stored
        self.title = self.title.trim().to_string();
        self.category = optional(self.category);
        self.image = optional(self.image);
        let mut errors = derive_errors(&self);
        if blank(&self.title) { errors.add("title", REQUIRED); }
        if blank(&self.content) { errors.add("content", REQUIRED); }
        errors.into_result(PostFields {
            title: self.title,
            content: self.content,
            category: self.category,
            image: self.image,
        })
    }

    pub fn from_fields(f: &PostFields) -> Self {
        Self {
            title: f.title.clone(),
            content: f.content.clone(),
            category: f.category.clone(),
            image: f.image.clone(),
        }
    }
}

/// A key that is present maps to `Some`, even when its value is `null`.
/// Paired with `#[serde(default)]`, a missing key stays `None`.
fn present<'de, D>(d: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(d).map(Some)
}

/// Body of `PATCH /api/posts/{id}/`; absent fields keep their stored value,
/// an explicit `null` clears a nullable one.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, nullable)]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, nullable)]
    pub image: Option<Option<String>>,
}

impl PostPatch {
    pub fn apply(self, current: PostFields) -> Result<PostFields, FieldErrors> {
        PostForm {
            title: self.title.unwrap_or(current.title),
            content: self.content.unwrap_or(current.content),
            category: self.category.unwrap_or(current.category),
            image: self.image.unwrap_or(current.image),
        }
        .clean()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CommentForm {
    #[serde(default)]
    pub content: String,
}

impl CommentForm {
    pub fn clean(self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::default();
        if blank(&self.content) { errors.add("content", REQUIRED); }
        errors.into_result(self.content)
    }
}

/// REST create payloads name the related rows explicitly.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewPostPayload {
    /// Ignored when the API enforces ownership.
    pub author: Option<Id>,
    #[serde(flatten)]
    pub form: PostForm,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewCommentPayload {
    pub post: Id,
    pub author: Option<Id>,
    #[serde(default)]
    pub content: String,
}

fn check_username(username: &str, errors: &mut FieldErrors) {
    if blank(username) {
        errors.add("username", REQUIRED);
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SignupForm {
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[serde(default, skip_serializing)]
    pub password1: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
}

/// Cleaned signup data; the password is still plain text here.
#[derive(Debug, Clone)]
pub struct Signup {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

impl SignupForm {
    pub fn clean(mut self) -> Result<Signup, FieldErrors> {
        self.username = self.username.trim().to_string();
        self.email = optional(self.email);
        let mut errors = derive_errors(&self);
        check_username(&self.username, &mut errors);
        if self.password1.is_empty() { errors.add("password1", REQUIRED); }
        if self.password2.is_empty() { errors.add("password2", REQUIRED); }
        if !self.password1.is_empty() && self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        } else if !self.password1.is_empty() {
            if self.password1.chars().count() < PASSWORD_MIN {
                errors.add(
                    "password2",
                    format!("This password is too short. It must contain at least {PASSWORD_MIN} characters."),
                );
            }
            if self.password1.chars().all(|c| c.is_ascii_digit()) {
                errors.add("password2", "This password is entirely numeric.");
            }
            if self.password1.eq_ignore_ascii_case(&self.username) {
                errors.add("password2", "The password is too similar to the username.");
            }
        }
        errors.into_result(Signup {
            username: self.username,
            email: self.email,
            password: self.password1,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    /// Posted alongside the credentials; wins over `?next=`.
    #[serde(default, skip_serializing)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProfileForm {
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
}

impl ProfileForm {
    pub fn clean(mut self) -> Result<UpdateUser, FieldErrors> {
        self.username = self.username.trim().to_string();
        self.email = optional(self.email);
        let mut errors = derive_errors(&self);
        check_username(&self.username, &mut errors);
        errors.into_result(UpdateUser { username: self.username, email: self.email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(title: &str, content: &str, category: Option<&str>) -> PostForm {
        PostForm {
            title: title.into(),
            content: content.into(),
            category: category.map(Into::into),
            image: None,
        }
    }

    #[test]
    fn post_form_limits() {
        let ok = post(&"t".repeat(200), "body", Some(&"c".repeat(100))).clean().unwrap();
        assert_eq!(ok.title.chars().count(), 200);

        let err = post(&"t".repeat(201), "body", Some(&"c".repeat(101))).clean().unwrap_err();
        assert!(err.get("title").is_some());
        assert!(err.get("category").is_some());
        assert!(err.get("content").is_none());
    }

    #[test]
    fn post_form_requires_title_and_content() {
        let err = post("   ", "", None).clean().unwrap_err();
        assert_eq!(err.get("title").unwrap().to_vec(), vec![REQUIRED.to_string()]);
        assert_eq!(err.get("content").unwrap().to_vec(), vec![REQUIRED.to_string()]);
    }

    #[test]
    fn limits_apply_after_trimming() {
        let f = post(&format!("{} ", "t".repeat(200)), "body", Some(&format!(" {} ", "c".repeat(100))))
            .clean()
            .unwrap();
        assert_eq!(f.title.chars().count(), 200);
        assert_eq!(f.category.map(|c| c.len()), Some(100));

        let signup = SignupForm {
            username: format!(" {} ", "u".repeat(150)),
            email: None,
            password1: "correct-horse".into(),
            password2: "correct-horse".into(),
        }
        .clean()
        .unwrap();
        assert_eq!(signup.username.len(), 150);

        let upd = ProfileForm { username: "  alice ".into(), email: None }.clean().unwrap();
        assert_eq!(upd.username, "alice");
    }

    #[test]
    fn patch_null_clears_but_missing_keeps() {
        let current = post("Hello", "World", Some("tech")).clean().unwrap();
        let cleared: PostPatch = serde_json::from_str(r#"{"category": null}"#).unwrap();
        assert_eq!(cleared.category, Some(None));
        assert_eq!(cleared.apply(current.clone()).unwrap().category, None);

        let untouched: PostPatch = serde_json::from_str(r#"{"title": "Bye"}"#).unwrap();
        assert_eq!(untouched.category, None);
        assert_eq!(untouched.apply(current).unwrap().category.as_deref(), Some("tech"));
    }

    #[test]
    fn blank_category_becomes_none() {
        let f = post("Hello", "World", Some("  ")).clean().unwrap();
        assert_eq!(f.category, None);
    }

    #[test]
    fn patch_keeps_untouched_fields() {
        let current = post("Hello", "World", Some("tech")).clean().unwrap();
        let patched = PostPatch { title: Some("Bye".into()), ..Default::default() }
            .apply(current)
            .unwrap();
        assert_eq!(patched.title, "Bye");
        assert_eq!(patched.content, "World");
        assert_eq!(patched.category.as_deref(), Some("tech"));
    }

    #[test]
    fn signup_password_rules() {
        let form = |p1: &str, p2: &str| SignupForm {
            username: "alice".into(),
            email: None,
            password1: p1.into(),
            password2: p2.into(),
        };
        assert!(form("correct-horse", "correct-horse").clean().is_ok());
        let e = form("correct-horse", "battery-staple").clean().unwrap_err();
        assert!(e.get("password2").unwrap()[0].contains("didn't match"));
        let e = form("short", "short").clean().unwrap_err();
        assert!(e.get("password2").unwrap()[0].contains("too short"));
        let e = form("1234567890", "1234567890").clean().unwrap_err();
        assert!(e.get("password2").unwrap().iter().any(|m| m.contains("numeric")));
    }

    #[test]
    fn signup_username_and_email() {
        let e = SignupForm {
            username: "bad name!".into(),
            email: Some("not-an-email".into()),
            password1: "correct-horse".into(),
            password2: "correct-horse".into(),
        }
        .clean()
        .unwrap_err();
        assert!(e.get("username").is_some());
        assert!(e.get("email").is_some());
    }

    #[test]
    fn comment_requires_content() {
        assert!(CommentForm { content: " ".into() }.clean().is_err());
        assert_eq!(CommentForm { content: "hi".into() }.clean().unwrap(), "hi");
    }
}
