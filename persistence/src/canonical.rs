//! `canonical_user_id` is a pure function and the single call site every
//! repository method routes `user_id` through before building a query or a
//! write (spec §4.4). Keeping it standalone (rather than inlined per
//! query) makes "every query canonicalizes" a property one function's
//! tests can vouch for, instead of an invariant scattered across SQL.

use chess_common::Platform;

pub fn canonical_user_id(user_id: &str, platform: Platform) -> String {
    platform.canonicalize_user_id(user_id)
}
