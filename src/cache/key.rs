// Cache key construction.
// Encodes operation arguments into a stable, unambiguous string.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::github::endpoints::TimeWindow;

/// Arguments that can be folded into a cache key.
///
/// Encodings are length-prefixed or delimited so distinct argument tuples
/// never produce the same key.
pub trait KeyArgs {
    fn encode_key(&self, out: &mut String);
}

/// Identity of a cached call: operation, encoded arguments, and optional bust token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub operation: &'static str,
    pub args: String,
    pub bust: Option<String>,
}

impl CacheKey {
    pub fn new<A: KeyArgs + ?Sized>(operation: &'static str, args: &A, bust: Option<&str>) -> Self {
        let mut encoded = String::new();
        args.encode_key(&mut encoded);
        Self {
            operation,
            args: encoded,
            bust: bust.map(str::to_string),
        }
    }
}

impl KeyArgs for str {
    fn encode_key(&self, out: &mut String) {
        out.push_str(&format!("s{}:{}", self.len(), self));
    }
}

impl KeyArgs for String {
    fn encode_key(&self, out: &mut String) {
        self.as_str().encode_key(out);
    }
}

impl<T: KeyArgs + ?Sized> KeyArgs for &T {
    fn encode_key(&self, out: &mut String) {
        (**self).encode_key(out);
    }
}

macro_rules! impl_key_args_for_int {
    ($($ty:ty),*) => {
        $(
            impl KeyArgs for $ty {
                fn encode_key(&self, out: &mut String) {
                    out.push_str(&format!("i{};", self));
                }
            }
        )*
    };
}

impl_key_args_for_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl KeyArgs for bool {
    fn encode_key(&self, out: &mut String) {
        out.push_str(if *self { "T" } else { "F" });
    }
}

impl KeyArgs for () {
    fn encode_key(&self, out: &mut String) {
        out.push_str("()");
    }
}

impl<T: KeyArgs> KeyArgs for Option<T> {
    fn encode_key(&self, out: &mut String) {
        match self {
            Some(value) => {
                out.push('?');
                value.encode_key(out);
            }
            None => out.push('-'),
        }
    }
}

impl<T: KeyArgs> KeyArgs for [T] {
    fn encode_key(&self, out: &mut String) {
        out.push_str(&format!("[{};", self.len()));
        for item in self {
            item.encode_key(out);
        }
        out.push(']');
    }
}

impl<T: KeyArgs> KeyArgs for Vec<T> {
    fn encode_key(&self, out: &mut String) {
        self.as_slice().encode_key(out);
    }
}

/// Keyword-style arguments. Iteration order is sorted by key.
impl<K: KeyArgs, V: KeyArgs> KeyArgs for BTreeMap<K, V> {
    fn encode_key(&self, out: &mut String) {
        out.push_str(&format!("{{{};", self.len()));
        for (key, value) in self {
            key.encode_key(out);
            out.push('=');
            value.encode_key(out);
        }
        out.push('}');
    }
}

impl KeyArgs for DateTime<Utc> {
    fn encode_key(&self, out: &mut String) {
        out.push_str(&format!("t{}.{};", self.timestamp(), self.timestamp_subsec_nanos()));
    }
}

impl KeyArgs for TimeWindow {
    fn encode_key(&self, out: &mut String) {
        self.since.encode_key(out);
        self.until.encode_key(out);
    }
}

macro_rules! impl_key_args_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: KeyArgs),+> KeyArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn encode_key(&self, out: &mut String) {
                let ($($name,)+) = self;
                out.push('(');
                $($name.encode_key(out);)+
                out.push(')');
            }
        }
    };
}

impl_key_args_for_tuple!(A);
impl_key_args_for_tuple!(A, B);
impl_key_args_for_tuple!(A, B, C);
impl_key_args_for_tuple!(A, B, C, D);
impl_key_args_for_tuple!(A, B, C, D, E);
impl_key_args_for_tuple!(A, B, C, D, E, F);
