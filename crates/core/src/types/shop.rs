//! Shop domain parsing and the install-flow normalization rule.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Suffix every Shopify-hosted shop domain carries.
pub const MYSHOPIFY_SUFFIX: &str = ".myshopify.com";

/// Errors that can occur when parsing a [`ShopDomain`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShopDomainError {
    /// The input string is empty.
    #[error("shop domain cannot be empty")]
    Empty,
    /// The input is longer than a DNS name may be.
    #[error("shop domain must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input does not end with `.myshopify.com`.
    #[error("shop domain must end with .myshopify.com")]
    WrongSuffix,
    /// The shop name contains characters Shopify does not allow.
    #[error("invalid shop name: {0}")]
    InvalidName(String),
}

/// Error raised by the install form before any navigation happens.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    /// Nothing was typed into the shop field.
    #[error("Please enter your shop domain")]
    EmptyShop,
}

/// A canonical Shopify shop domain, `<name>.myshopify.com`.
///
/// This is the strict form checked before any call to Shopify. The install
/// form uses the looser [`normalize_shop_input`] instead.
///
/// ## Examples
///
/// ```
/// use shop_catalog_core::ShopDomain;
///
/// assert!(ShopDomain::parse("my-store.myshopify.com").is_ok());
/// assert!(ShopDomain::parse("  My-Store.myshopify.com ").is_ok());
///
/// assert!(ShopDomain::parse("").is_err());
/// assert!(ShopDomain::parse("my-store.com").is_err());
/// assert!(ShopDomain::parse("evil.com/.myshopify.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ShopDomain(String);

impl ShopDomain {
    /// Maximum length of a DNS host name.
    pub const MAX_LENGTH: usize = 253;

    /// Parse a `ShopDomain`, trimming whitespace and lowercasing.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, lacks the
    /// `.myshopify.com` suffix, or the shop name is not made of ASCII
    /// alphanumerics, `-` and `_` starting with an alphanumeric.
    pub fn parse(s: &str) -> Result<Self, ShopDomainError> {
        let value = s.trim().to_ascii_lowercase();

        if value.is_empty() {
            return Err(ShopDomainError::Empty);
        }

        if value.len() > Self::MAX_LENGTH {
            return Err(ShopDomainError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let name = value
            .strip_suffix(MYSHOPIFY_SUFFIX)
            .ok_or(ShopDomainError::WrongSuffix)?;

        let starts_alphanumeric = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric());
        let valid_chars = name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if !starts_alphanumeric || !valid_chars {
            return Err(ShopDomainError::InvalidName(name.to_owned()));
        }

        Ok(Self(value))
    }

    /// Returns the domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShopDomain {
    type Error = ShopDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShopDomain> for String {
    fn from(domain: ShopDomain) -> Self {
        domain.0
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize free text typed into the install form.
///
/// Appends `.myshopify.com` only when the input has neither that suffix nor
/// any dot at all, so custom domains like `my-shop.co` pass through untouched.
///
/// # Errors
///
/// Returns [`InstallError::EmptyShop`] when the trimmed input is empty.
pub fn normalize_shop_input(input: &str) -> Result<String, InstallError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(InstallError::EmptyShop);
    }

    if !trimmed.contains(MYSHOPIFY_SUFFIX) && !trimmed.contains('.') {
        return Ok(format!("{trimmed}{MYSHOPIFY_SUFFIX}"));
    }

    Ok(trimmed.to_owned())
}

/// Build the backend authorize URL the install form navigates to.
#[must_use]
pub fn install_redirect_url(backend_url: &str, shop: &str) -> String {
    format!(
        "{}/auth?shop={}",
        backend_url.trim_end_matches('/'),
        urlencoding::encode(shop)
    )
}
