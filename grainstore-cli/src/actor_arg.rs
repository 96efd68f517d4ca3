use grainstore::ActorReference;

/// An actor given on the command line, either in canonical form
/// (`ActorReference=Counter/int:1`) or without the marker (`Counter/int:1`)
#[derive(Debug, Clone)]
pub(crate) struct ActorArg(pub(crate) ActorReference);

impl std::str::FromStr for ActorArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical = if s.starts_with("ActorReference=") {
            s.to_string()
        } else {
            format!("ActorReference={s}")
        };
        canonical
            .parse()
            .map(ActorArg)
            .map_err(|e| format!("invalid actor {s:?}: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use grainstore::PrimaryKey;

    use super::*;

    #[test]
    fn both_forms_parse() {
        let short: ActorArg = "Counter/int:1".parse().unwrap();
        let long: ActorArg = "ActorReference=Counter/int:1".parse().unwrap();
        assert_eq!(short.0, long.0);
        assert_eq!(short.0.primary_key(), &PrimaryKey::Integer(1));
    }

    #[test]
    fn bad_keys_are_reported() {
        let err = "Counter/number:1".parse::<ActorArg>().unwrap_err();
        assert!(err.contains("Counter/number:1"), "{err}");
    }
}
