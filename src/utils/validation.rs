use crate::error::{Error, Result};
use validator::Validate;

pub fn validate<T: Validate>(val: &T) -> Result<()> {
    val.validate()?;
    Ok(())
}

/// Path ids are positive database keys.
pub fn require_id(name: &str, id: i64) -> Result<i64> {
    if id > 0 {
        Ok(id)
    } else {
        Err(Error::BadRequest(format!("{} must be a positive id", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_positive() {
        assert_eq!(require_id("studentId", 3).unwrap(), 3);
        assert!(matches!(require_id("studentId", 0), Err(Error::BadRequest(_))));
    }
}
