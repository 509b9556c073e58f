pub fn pluralize(count: usize, singular: &str) -> String {
    if count == 1 {
        singular.to_string()
    } else {
        format!("{singular}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pluralize_handles_zero_and_one() {
        assert_eq!(pluralize(0, "record"), "records");
        assert_eq!(pluralize(1, "record"), "record");
        assert_eq!(pluralize(2, "record"), "records");
    }
}
