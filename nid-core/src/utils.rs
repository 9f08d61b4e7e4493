/// Encodes a package name as a single URL path segment.
/// The scope marker is kept as is, the `/` between scope and name is escaped.
pub fn encode_package_name(package_name: &str) -> String {
    match package_name.strip_prefix('@') {
        Some(scoped) => format!("@{}", urlencoding::encode(scoped)),
        None => urlencoding::encode(package_name).into_owned(),
    }
}

/// Strips the `@org/` prefix from a scoped package name.
pub fn strip_organisation(package_name: &str) -> &str {
    if !package_name.starts_with('@') {
        return package_name;
    }
    match package_name.split_once('/') {
        Some((_, name)) => name,
        None => package_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_unscoped_package_name() {
        assert_eq!(encode_package_name("left-pad"), "left-pad");
    }

    #[test]
    fn test_encode_scoped_package_name() {
        assert_eq!(encode_package_name("@babel/core"), "@babel%2Fcore");
    }

    #[test]
    fn test_strip_organisation_1() {
        assert_eq!(strip_organisation("@babel/core"), "core");
    }

    #[test]
    fn test_strip_organisation_2() {
        assert_eq!(strip_organisation("left-pad"), "left-pad");
    }

    #[test]
    fn test_strip_organisation_3() {
        assert_eq!(strip_organisation("@babel"), "@babel");
    }
}
