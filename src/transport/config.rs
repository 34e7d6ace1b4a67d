use super::{ConnectOptions, Engine};

pub fn parse_engine(s: &str) -> Option<Engine> {
    match s.to_lowercase().as_str() {
        "kinesis" => Some(Engine::Kinesis),
        #[cfg(any(test, feature = "transport-mock"))]
        "mock" => Some(Engine::Mock),
        _ => None,
    }
}

pub fn parse_connect_kv(pairs: &[String]) -> ConnectOptions {
    let mut opts = ConnectOptions::default();
    for p in pairs {
        if let Some((k, v)) = p.split_once('=') {
            opts.params.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
    opts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engines_parse_case_insensitively() {
        assert_eq!(parse_engine("Kinesis"), Some(Engine::Kinesis));
        assert_eq!(parse_engine("mock"), Some(Engine::Mock));
        assert_eq!(parse_engine("zenoh"), None);
    }

    #[test]
    fn connect_pairs_skip_malformed_entries() {
        let opts = parse_connect_kv(&[
            "region=eu-west-1".to_string(),
            "garbage".to_string(),
            "endpoint_url = http://localhost:4566".to_string(),
        ]);
        assert_eq!(opts.params.len(), 2);
        assert_eq!(opts.params["region"], "eu-west-1");
        assert_eq!(opts.params["endpoint_url"], "http://localhost:4566");
    }
}
