pub mod key_publisher;
pub mod key_rotator;
pub mod registrar;
pub mod tokenizer;

pub use key_publisher::{KmsKeyPublisher, PublishError};
pub use key_rotator::{KeyRotator, RotationOutcome, SigningKeySource};
pub use registrar::{FnRegistrar, PublicKeyRegistrar};
pub use tokenizer::{Claims, TokenIssuer, Tokenizer};
