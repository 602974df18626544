// --- File: crates/meetsync_scheduler/src/token_test.rs ---
use crate::token::TokenSigner;
use std::collections::HashSet;

#[test]
fn minted_tokens_verify_and_are_unique() {
    let signer = TokenSigner::new("test-secret").unwrap();
    let tokens: HashSet<String> = (0..64).map(|_| signer.mint().unwrap()).collect();
    assert_eq!(tokens.len(), 64);
    for token in &tokens {
        assert!(signer.verify(token), "token should verify: {token}");
        let (body, signature) = token.split_once('.').unwrap();
        assert_eq!(body.len(), 43);
        assert_eq!(signature.len(), 16);
    }
}

#[test]
fn tampered_or_foreign_tokens_are_rejected() {
    let signer = TokenSigner::new("test-secret").unwrap();
    let other = TokenSigner::new("another-secret").unwrap();
    let token = signer.mint().unwrap();

    assert!(!other.verify(&token));

    let (body, signature) = token.split_once('.').unwrap();
    let mut flipped = signature.to_string();
    let last = if flipped.ends_with('0') { "1" } else { "0" };
    flipped.replace_range(15..16, last);
    assert!(!signer.verify(&format!("{body}.{flipped}")));

    assert!(!signer.verify(""));
    assert!(!signer.verify("not-a-token"));
    assert!(!signer.verify(&format!("{body}.")));
    assert!(!signer.verify(&format!("short.{signature}")));
}

#[test]
fn empty_secret_is_refused() {
    assert!(TokenSigner::new("").is_err());
}
