use argon2::{
    Argon2,
    password_hash::{Error, PasswordHash, PasswordVerifier},
};

pub fn verify_password(password: &str, hashed: &str) -> Result<(), Error> {
    let parsed = PasswordHash::new(hashed)?;
    Argon2::default().verify_password(password.as_bytes(), &parsed)
}
