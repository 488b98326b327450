//! Fixtures shared by unit tests.

/// 2048-bit RSA key used only by tests.
pub(crate) const TEST_PRIVATE_KEY: &str = include_str!("testdata/test_key.pem");

/// Public half of [`TEST_PRIVATE_KEY`].
pub(crate) const TEST_PUBLIC_KEY: &str = include_str!("testdata/test_key.pub.pem");
