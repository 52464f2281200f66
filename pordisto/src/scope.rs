//! OAuth2 scopes and per-route scope requirements
//!
//! Scope tokens follow [RFC 6749, Section 3.3][RFC6749 3.3].
//!
//!   [RFC6749 3.3]: https://datatracker.ietf.org/doc/html/rfc6749#section-3.3

use std::{
    collections::{btree_set, BTreeSet},
    fmt,
    str::FromStr,
};

use aliri_braid::braid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An invalid scope token
#[derive(Debug, Error)]
pub enum InvalidScopeToken {
    /// The scope token was the empty string
    #[error("scope token cannot be empty")]
    EmptyString,
    /// The scope token contained an invalid byte
    #[error("invalid scope token byte at position {position}: 0x{value:02x}")]
    InvalidByte {
        /// The index in the scope token where the invalid byte was found
        position: usize,
        /// The invalid byte value
        value: u8,
    },
}

impl From<std::convert::Infallible> for InvalidScopeToken {
    #[inline(always)]
    fn from(x: std::convert::Infallible) -> Self {
        match x {}
    }
}

/// A single OAuth2 scope token, such as `greet` or `read:messages`
///
/// A scope token is non-empty and composed of printable ASCII characters
/// excluding ` ` (space), `"` (double quote), and `\` (backslash).
#[braid(
    serde,
    validator,
    ref_doc = "A borrowed reference to a [`ScopeToken`]"
)]
pub struct ScopeToken;

impl aliri_braid::Validator for ScopeToken {
    type Error = InvalidScopeToken;

    fn validate(s: &str) -> Result<(), Self::Error> {
        if s.is_empty() {
            return Err(InvalidScopeToken::EmptyString);
        }

        match s
            .bytes()
            .enumerate()
            .find(|&(_, b)| b <= 0x20 || b == b'"' || b == b'\\' || 0x7F <= b)
        {
            Some((position, value)) => Err(InvalidScopeToken::InvalidByte { position, value }),
            None => Ok(()),
        }
    }
}

/// Wire shapes accepted for the `scope` claim
///
/// Most issuers send a space-delimited string, but some send an array of
/// tokens instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum ScopeDto {
    String(String),
    Array(Vec<ScopeToken>),
}

impl TryFrom<Option<ScopeDto>> for Scope {
    type Error = InvalidScopeToken;

    fn try_from(dto: Option<ScopeDto>) -> Result<Self, Self::Error> {
        match dto {
            Some(ScopeDto::String(s)) => Self::try_from(s.as_str()),
            Some(ScopeDto::Array(tokens)) => Ok(tokens.into_iter().collect()),
            None => Ok(Self::empty()),
        }
    }
}

impl From<Scope> for ScopeDto {
    fn from(scope: Scope) -> Self {
        ScopeDto::String(scope.to_string())
    }
}

/// A set of scope tokens
///
/// Duplicates collapse and order is not significant. When displayed, tokens
/// are rendered in sorted order separated by single spaces, which is also
/// the form used on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "Option<ScopeDto>", into = "ScopeDto")]
pub struct Scope(BTreeSet<ScopeToken>);

impl Scope {
    /// Produces an empty scope
    #[inline]
    pub const fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// Constructs a new scope from a single scope token
    #[inline]
    pub fn single(scope_token: ScopeToken) -> Self {
        Self::empty().and(scope_token)
    }

    /// Adds an additional scope token
    #[inline]
    pub fn and(mut self, scope_token: ScopeToken) -> Self {
        self.insert(scope_token);
        self
    }

    /// Adds a scope token to the scope
    #[inline]
    pub fn insert(&mut self, scope_token: ScopeToken) {
        self.0.insert(scope_token);
    }

    /// Whether this scope holds no tokens
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct tokens in this scope
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the given token is part of this scope
    #[inline]
    pub fn contains(&self, scope_token: &ScopeTokenRef) -> bool {
        self.0.contains(scope_token)
    }

    /// Produces an iterator of the scope tokens in this set
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        self.into_iter()
    }

    /// Checks to see whether this scope contains all of
    /// the scope tokens in `subset`.
    #[inline]
    pub fn contains_all(&self, subset: &Scope) -> bool {
        self.0.is_superset(&subset.0)
    }

    /// The tokens of `required` that this scope lacks
    pub fn missing_from(&self, required: &Scope) -> Scope {
        Scope(required.0.difference(&self.0).cloned().collect())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut tokens = self.0.iter();
        if let Some(first) = tokens.next() {
            f.write_str(first.as_str())?;
            for token in tokens {
                f.write_str(" ")?;
                f.write_str(token.as_str())?;
            }
        }
        Ok(())
    }
}

impl IntoIterator for Scope {
    type Item = ScopeToken;
    type IntoIter = btree_set::IntoIter<ScopeToken>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// An iterator over a set of borrowed scope tokens
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    iter: btree_set::Iter<'a, ScopeToken>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a ScopeTokenRef;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|x| x.as_ref())
    }
}

impl<'a> IntoIterator for &'a Scope {
    type Item = &'a ScopeTokenRef;
    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        Iter {
            iter: self.0.iter(),
        }
    }
}

impl<S> Extend<S> for Scope
where
    S: Into<ScopeToken>,
{
    #[inline]
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = S>,
    {
        self.0.extend(iter.into_iter().map(Into::into))
    }
}

impl<S> FromIterator<S> for Scope
where
    S: Into<ScopeToken>,
{
    #[inline]
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = S>,
    {
        let mut set = Self::empty();
        set.extend(iter);
        set
    }
}

impl TryFrom<&'_ str> for Scope {
    type Error = InvalidScopeToken;

    #[inline]
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.split_whitespace()
            .map(|t| ScopeToken::new(t.to_owned()))
            .collect()
    }
}

impl FromStr for Scope {
    type Err = InvalidScopeToken;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

/// Indicates the requester held insufficient scope to be granted access
/// to a controlled resource
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("insufficient scope: token lacks \"{missing}\"")]
pub struct InsufficientScope {
    /// The full set of tokens the route requires
    pub required: Scope,
    /// The required tokens that the presented token did not carry
    pub missing: Scope,
}

/// The scopes a route demands of every caller
///
/// A requirement is a single set of scope tokens, all of which must be
/// held. An empty requirement only asks that the caller be authenticated,
/// and its check is skipped entirely.
///
/// ```
/// use pordisto::{scope, Scope, ScopeRequirement};
///
/// let requirement = ScopeRequirement::all_of(scope!["greet"]);
///
/// let held: Scope = "greet read".parse().unwrap();
/// assert!(requirement.evaluate(&held).is_ok());
///
/// let held: Scope = "read".parse().unwrap();
/// assert!(requirement.evaluate(&held).is_err());
///
/// assert!(ScopeRequirement::none().evaluate(&Scope::empty()).is_ok());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct ScopeRequirement {
    required: Scope,
}

impl ScopeRequirement {
    /// A requirement that asks for no scopes at all
    #[inline]
    pub const fn none() -> Self {
        Self {
            required: Scope::empty(),
        }
    }

    /// A requirement that every token in `scope` be held
    #[inline]
    pub const fn all_of(scope: Scope) -> Self {
        Self { required: scope }
    }

    /// Whether this requirement is vacuous
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }

    /// The required scope tokens
    #[inline]
    pub fn scope(&self) -> &Scope {
        &self.required
    }

    /// Checks the scope held by a caller against this requirement
    pub fn evaluate(&self, held: &Scope) -> Result<(), InsufficientScope> {
        if held.contains_all(&self.required) {
            Ok(())
        } else {
            Err(InsufficientScope {
                required: self.required.clone(),
                missing: held.missing_from(&self.required),
            })
        }
    }
}

impl From<Scope> for ScopeRequirement {
    #[inline]
    fn from(scope: Scope) -> Self {
        Self::all_of(scope)
    }
}

/// Construct a [`Scope`] from a list of static scope token literals
///
/// # Panics
///
/// Panics if any of the literals is not a valid [`ScopeToken`].
///
/// ```
/// use pordisto::scope;
///
/// let scope = scope!["greet", "read:messages"];
/// assert_eq!(scope.to_string(), "greet read:messages");
/// ```
#[macro_export]
macro_rules! scope {
    ($($token:literal),* $(,)?) => {
        $crate::Scope::empty()
        $(
            .and(match $crate::scope::ScopeToken::new(::std::string::String::from($token)) {
                ::std::result::Result::Ok(token) => token,
                ::std::result::Result::Err(err) => panic!("{}: scope token = {}", err, $token),
            })
        )*
    };
}
