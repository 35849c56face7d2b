/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! Parsed `INFO` reply.

/// Keyspace statistics of a single database (`db0:keys=1,expires=0,avg_ttl=0`).
#[derive(Debug, PartialEq)]
pub struct KeyspaceInfo {
    pub db: String,
    pub keys: f64,
    pub expires: f64,
}

/// Numeric fields, keyspace and identity of a Redis node.
#[derive(Debug, Default)]
pub struct RedisInfo {
    pub numeric_fields: Vec<(String, f64)>,
    pub keyspaces: Vec<KeyspaceInfo>,
    pub role: Option<String>,
    pub version: Option<String>,
    pub mode: Option<String>,
}

impl RedisInfo {
    /// Parse the `key:value` lines of an `INFO` reply.
    ///
    /// Section headers (`# Server`) and non-numeric values other than the
    /// node identity are ignored.
    pub fn parse(info: &str) -> Self {
        let mut ret = Self::default();
        for line in info.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            match key {
                "role" => ret.role = Some(value.to_owned()),
                "redis_version" => ret.version = Some(value.to_owned()),
                "redis_mode" => ret.mode = Some(value.to_owned()),
                db if Self::is_keyspace_key(db) => {
                    if let Some(keyspace) = Self::parse_keyspace(db, value) {
                        ret.keyspaces.push(keyspace);
                    }
                }
                _ => {
                    if let Ok(value) = value.parse::<f64>() {
                        ret.numeric_fields.push((key.to_owned(), value));
                    }
                }
            }
        }
        ret
    }

    fn is_keyspace_key(key: &str) -> bool {
        key.strip_prefix("db")
            .is_some_and(|index| !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()))
    }

    fn parse_keyspace(db: &str, value: &str) -> Option<KeyspaceInfo> {
        let mut keys = None;
        let mut expires = None;
        for (name, value) in value.split(',').filter_map(|pair| pair.split_once('=')) {
            match name {
                "keys" => keys = value.parse::<f64>().ok(),
                "expires" => expires = value.parse::<f64>().ok(),
                _ => {}
            }
        }
        Some(KeyspaceInfo {
            db: db.to_owned(),
            keys: keys?,
            expires: expires.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_info_reply() {
        let info = RedisInfo::parse(
            "# Server\r\nredis_version:7.2.4\r\nredis_mode:standalone\r\nuptime_in_seconds:1234\r\n\r\n\
             # Replication\r\nrole:master\r\nconnected_slaves:0\r\nmaster_replid:abc\r\n\r\n\
             # Stats\r\ntotal_commands_processed:99\r\n\r\n\
             # Keyspace\r\ndb0:keys=10,expires=2,avg_ttl=0\r\ndb3:keys=1,expires=0,avg_ttl=0\r\n",
        );
        assert_eq!(info.version.as_deref(), Some("7.2.4"));
        assert_eq!(info.mode.as_deref(), Some("standalone"));
        assert_eq!(info.role.as_deref(), Some("master"));
        assert!(info
            .numeric_fields
            .contains(&("uptime_in_seconds".to_owned(), 1234.0)));
        assert!(info
            .numeric_fields
            .contains(&("total_commands_processed".to_owned(), 99.0)));
        assert!(!info.numeric_fields.iter().any(|(key, _)| key == "master_replid"));
        assert_eq!(
            info.keyspaces,
            vec![
                KeyspaceInfo {
                    db: "db0".to_owned(),
                    keys: 10.0,
                    expires: 2.0
                },
                KeyspaceInfo {
                    db: "db3".to_owned(),
                    keys: 1.0,
                    expires: 0.0
                },
            ]
        );
    }

    #[test]
    fn dbfilename_is_not_a_keyspace() {
        let info = RedisInfo::parse("dbfilename:dump.rdb\r\ndb0:expires=1\r\n");
        assert!(info.keyspaces.is_empty());
        assert!(info.numeric_fields.is_empty());
    }
}
