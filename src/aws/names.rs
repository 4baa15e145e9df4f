use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BUCKET_NAME: Regex = Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").unwrap();
    static ref IPV4_LIKE: Regex = Regex::new(r"^\d+\.\d+\.\d+\.\d+$").unwrap();
    static ref FUNCTION_NAME: Regex = Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap();
    static ref QUEUE_NAME: Regex =
        Regex::new(r"^(?:[A-Za-z0-9_-]{1,80}|[A-Za-z0-9_-]{1,75}\.fifo)$").unwrap();
}

/// Checks an S3 bucket name against the general purpose bucket naming rules.
pub fn check_bucket_name(name: &str) -> Result<(), &'static str> {
    if !BUCKET_NAME.is_match(name) {
        return Err("use 3-63 lowercase letters, digits, dots or hyphens, starting and ending with a letter or digit");
    }
    if name.contains("..") {
        return Err("must not contain two adjacent periods");
    }
    if IPV4_LIKE.is_match(name) {
        return Err("must not be formatted as an IP address");
    }
    Ok(())
}

pub fn check_function_name(name: &str) -> Result<(), &'static str> {
    if FUNCTION_NAME.is_match(name) {
        Ok(())
    } else {
        Err("use 1-64 letters, digits, hyphens or underscores")
    }
}

pub fn check_queue_name(name: &str) -> Result<(), &'static str> {
    if QUEUE_NAME.is_match(name) {
        Ok(())
    } else {
        Err("use up to 80 letters, digits, hyphens or underscores, optionally ending in .fifo")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_names() {
        assert!(check_bucket_name("demo-bucket").is_ok());
        assert!(check_bucket_name("karp.assets.2025").is_ok());

        assert!(check_bucket_name("ab").is_err());
        assert!(check_bucket_name("Demo-Bucket").is_err());
        assert!(check_bucket_name("-leading-hyphen").is_err());
        assert!(check_bucket_name("double..dot").is_err());
        assert!(check_bucket_name("192.168.5.4").is_err());
        assert!(check_bucket_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_function_names() {
        assert!(check_function_name("resize_images-v2").is_ok());
        assert!(check_function_name("has space").is_err());
        assert!(check_function_name(&"f".repeat(65)).is_err());
    }

    #[test]
    fn test_queue_names() {
        assert!(check_queue_name("jobs").is_ok());
        assert!(check_queue_name("jobs.fifo").is_ok());
        assert!(check_queue_name("jobs.standard").is_err());
        assert!(check_queue_name(&"q".repeat(81)).is_err());
    }
}
