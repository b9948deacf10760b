// core/src/validation.rs

//! Form validation run before any network call. Every check collects
//! per-field messages so a form can highlight all problems at once.

use crate::error::{FieldErrors, Result, TuckshopError};
use crate::models::{CategoryDraft, Credentials, ProductDraft, ProfileUpdate, RegisterForm};

pub const MIN_NAME_LEN: usize = 2;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Default)]
struct Checker {
  errors: FieldErrors,
}

impl Checker {
  fn fail(&mut self, field: &str, message: &str) {
    self.errors.entry(field.to_string()).or_insert_with(|| message.to_string());
  }

  fn require(&mut self, field: &str, value: &str, label: &str) -> bool {
    if value.trim().is_empty() {
      self.fail(field, &format!("{} is required", label));
      false
    } else {
      true
    }
  }

  fn email(&mut self, field: &str, value: &str) {
    if self.require(field, value, "Email") && !looks_like_email(value.trim()) {
      self.fail(field, "Enter a valid email address");
    }
  }

  fn finish(self) -> Result<()> {
    if self.errors.is_empty() {
      Ok(())
    } else {
      Err(TuckshopError::Validation(self.errors))
    }
  }
}

/// `local@domain.tld` with no whitespace; good enough to catch typos.
pub fn looks_like_email(value: &str) -> bool {
  let Some((local, domain)) = value.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !value.chars().any(char::is_whitespace)
    && !domain.contains('@')
    && domain
      .split_once('.')
      .map_or(false, |(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

pub fn validate_credentials(credentials: &Credentials) -> Result<()> {
  let mut check = Checker::default();
  check.email("email", &credentials.email);
  check.require("password", &credentials.password, "Password");
  check.finish()
}

pub fn validate_registration(form: &RegisterForm) -> Result<()> {
  let mut check = Checker::default();
  if check.require("name", &form.name, "Name") && form.name.trim().chars().count() < MIN_NAME_LEN {
    check.fail("name", "Name must be at least 2 characters");
  }
  check.email("email", &form.email);
  if form.password.chars().count() < MIN_PASSWORD_LEN {
    check.fail("password", "Password must be at least 6 characters");
  }
  if form.password != form.confirm_password {
    check.fail("confirmPassword", "Passwords do not match");
  }
  check.finish()
}

pub fn validate_profile(update: &ProfileUpdate) -> Result<()> {
  let mut check = Checker::default();
  if let Some(name) = &update.name {
    if name.trim().chars().count() < MIN_NAME_LEN {
      check.fail("name", "Name must be at least 2 characters");
    }
  }
  if let Some(email) = &update.email {
    check.email("email", email);
  }
  if update.name.is_none() && update.email.is_none() && update.profile_image.is_none() {
    check.fail("profile", "Nothing to update");
  }
  check.finish()
}

pub fn validate_product(draft: &ProductDraft) -> Result<()> {
  let mut check = Checker::default();
  check.require("name", &draft.name, "Product name");
  if !draft.price.is_finite() || draft.price <= 0.0 {
    check.fail("price", "Price must be greater than zero");
  }
  if draft.stock < 0 {
    check.fail("stock", "Stock cannot be negative");
  }
  if draft.category_id <= 0 {
    check.fail("categoryId", "Choose a category");
  }
  check.finish()
}

pub fn validate_category(draft: &CategoryDraft) -> Result<()> {
  let mut check = Checker::default();
  check.require("name", &draft.name, "Category name");
  check.finish()
}

pub fn validate_quantity(quantity: u32) -> Result<()> {
  if quantity == 0 {
    return Err(TuckshopError::field("quantity", "Quantity must be at least 1"));
  }
  Ok(())
}
