// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! URL base replacement.
//!
//! Endpoint URLs handed out by the relay are meant for service-to-service
//! traffic. The client-to-client variant of the same endpoint is obtained by
//! swapping the URL base (scheme + authority) for `ConnectionInfo::c2c_url_base()`.

/// Replace the URL base (scheme + host + optional port) of `existing_url`
/// with `new_base`, keeping path, query and fragment.
///
/// `existing_url` without a `scheme://` prefix is returned unchanged. A
/// trailing `/` on `new_base` is dropped so the result never contains `//`
/// at the join.
///
/// # Example
///
/// ```
/// use relay_connector::replace_url_base;
///
/// let url = replace_url_base("https://svc.example.com/path?x=1", "https://c2c.example.com");
/// assert_eq!(url, "https://c2c.example.com/path?x=1");
/// ```
pub fn replace_url_base(existing_url: &str, new_base: &str) -> String {
    let Some(scheme_end) = existing_url.find("://") else {
        return existing_url.to_string();
    };

    let authority_start = scheme_end + 3;
    let rest_start = existing_url[authority_start..]
        .find(['/', '?', '#'])
        .map_or(existing_url.len(), |offset| authority_start + offset);

    let base = new_base.trim_end_matches('/');
    let rest = &existing_url[rest_start..];

    let mut out = String::with_capacity(base.len() + rest.len());
    out.push_str(base);
    out.push_str(rest);
    out
}
