/// 定义以字符串形式存储与传输的枚举
///
/// 生成 `as_str`、`ALL`、`Display`、`FromStr` 以及带友好报错的 `Deserialize`，
/// 同时导出 TypeScript 类型。数据库中的字符串列统一通过 `FromStr` 还原。
#[macro_export]
macro_rules! define_string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident => $export:tt {
            $( $(#[$vmeta:meta])* $variant:ident = $value:tt ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::ts_rs::TS)]
        #[ts(export, export_to = $export)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    _ => Err(format!(
                        "Invalid {}: '{}'. Supported values: {}",
                        stringify!($name),
                        s,
                        [$($value),+].join(", ")
                    )),
                }
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(::serde::de::Error::custom)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    crate::define_string_enum! {
        enum Fruit => "../frontend/src/types/generated/test_fruit.ts" {
            Apple = "apple",
            BloodOrange = "blood_orange",
        }
    }

    #[test]
    fn test_round_trip_through_str() {
        assert_eq!(Fruit::BloodOrange.as_str(), "blood_orange");
        assert_eq!("apple".parse::<Fruit>().unwrap(), Fruit::Apple);
        assert_eq!(Fruit::ALL.len(), 2);
    }

    #[test]
    fn test_unknown_value_lists_supported() {
        let err = "pear".parse::<Fruit>().unwrap_err();
        assert!(err.contains("apple, blood_orange"));
    }

    #[test]
    fn test_serde_uses_rename() {
        let json = serde_json::to_string(&Fruit::BloodOrange).unwrap();
        assert_eq!(json, "\"blood_orange\"");
        let back: Fruit = serde_json::from_str("\"apple\"").unwrap();
        assert_eq!(back, Fruit::Apple);
        assert!(serde_json::from_str::<Fruit>("\"kiwi\"").is_err());
    }
}
