//! # IdentityKit - Pure Rust Identity Export
//!
//! IdentityKit manages cryptographic identities, an RSA private key paired with
//! the X.509 certificate for its public key, and exports them as
//! password-protected PKCS#12 archives. It is built entirely with rustcrypto
//! libraries; openssl is used only in tests, to check that the archives open
//! in a standard toolkit.
//!
//! ## Key Features
//!
//! - **DER codec**: Decode certificates and PKCS#1 or PKCS#8 RSA private keys
//! - **Key-pair matching**: Verify a key belongs to a certificate before export
//! - **PKCS#12 export**: PBES2/AES-256-CBC bags and an HMAC-SHA256 integrity MAC
//! - **PKCS#12 import**: Read archives back with the same password
//! - **Pluggable storage**: Keys by tag and certificates by label behind [`store::IdentityStore`]
//! - **Command dispatch**: A method-name surface for bridging to other runtimes
//!
//! ## Quick Start
//!
//! ### Exporting an Identity
//!
//! ```rust,no_run
//! use identitykit::{
//!     cert::{Certificate, params::{CertificateParams, DistinguishedName}},
//!     key::PrivateKey,
//!     pkcs12,
//! };
//!
//! # fn main() -> Result<(), identitykit::error::IdentityKitError> {
//! let key = PrivateKey::generate_rsa(2048)?;
//!
//! let params = CertificateParams::builder()
//!     .subject(DistinguishedName::builder().common_name("device-01").build())
//!     .build();
//! let certificate = Certificate::new_self_signed(&params, &key)?;
//!
//! let archive = pkcs12::build(&key, &certificate, "device-01", "secret")?;
//! std::fs::write("device-01.p12", archive.as_bytes()).ok();
//! # Ok(())
//! # }
//! ```
//!
//! ### Working Through a Store
//!
//! ```rust,no_run
//! use identitykit::{
//!     identity::IdentityManager,
//!     key::KeyAttributes,
//!     store::MemoryIdentityStore,
//! };
//!
//! # fn main() -> Result<(), identitykit::error::IdentityKitError> {
//! # let certificate_der: Vec<u8> = Vec::new();
//! let manager = IdentityManager::new(MemoryIdentityStore::new());
//!
//! // SubjectPublicKeyInfo DER, to be certified elsewhere
//! let spki = manager.generate_key(&KeyAttributes::builder().tag("t1").size(2048).build())?;
//!
//! manager.create_identity(&certificate_der, "c1")?;
//! let archive = manager.load_identity("t1", "bundle", "secret")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns a typed [`error::IdentityKitError`]:
//!
//! ```rust
//! use identitykit::{cert::Certificate, error::IdentityKitError};
//!
//! match Certificate::from_der(&[0x30, 0x03, 0x02]) {
//!     Ok(_) => println!("Certificate decoded"),
//!     Err(IdentityKitError::MalformedInput(msg)) => println!("Bad DER: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`key`]: RSA key generation, decoding and key attributes
//! - [`cert`]: Certificate decoding, encoding and self-signing
//! - [`issuer`]: Certificate issuing by self-signed keys and stored identities
//! - [`matcher`]: Private key and certificate pair checks
//! - [`pkcs12`]: PKCS#12 archive building and parsing
//! - [`store`]: Identity storage backends
//! - [`identity`]: Typed identity operations over a store
//! - [`dispatch`]: Method-name command surface
//! - [`error`]: Error types

pub mod cert;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod issuer;
pub mod key;
pub mod matcher;
pub mod pkcs12;
pub mod store;
