//! Identity-provider compatibility patch
//!
//! Firebase-style auth libraries detect "we are resuming a redirect sign-in"
//! through pending-redirect markers in `sessionStorage`. Embedded webviews
//! lose that storage across the IdP round trip, which strands the library in
//! an unrecoverable "missing initial state" condition. This script is
//! evaluated in the page context whenever navigation enters an allow-listed
//! identity-provider domain; it clears the markers and substitutes the
//! popup-based sign-in call for the redirect-based one. Fire-and-forget: no
//! acknowledgment channel, failure is silent.

pub const AUTH_COMPAT_SCRIPT: &str = r#"
(function() {
    if (window.__bithashAuthCompat) { return; }
    window.__bithashAuthCompat = true;

    try {
        for (var i = sessionStorage.length - 1; i >= 0; i--) {
            var key = sessionStorage.key(i);
            if (key && key.indexOf('firebase:pendingRedirect') === 0) {
                sessionStorage.removeItem(key);
            }
        }
    } catch (e) { /* storage may be inaccessible in this context */ }

    try {
        var patch = function(auth) {
            if (auth
                && typeof auth.signInWithRedirect === 'function'
                && typeof auth.signInWithPopup === 'function') {
                auth.signInWithRedirect = function(provider) {
                    return auth.signInWithPopup(provider);
                };
            }
        };
        if (window.firebase && typeof window.firebase.auth === 'function') {
            patch(window.firebase.auth());
        }
    } catch (e) { /* the page may not carry the library at all */ }
})();
"#;
