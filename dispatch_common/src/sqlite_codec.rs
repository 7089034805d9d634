/// Stores a `Decimal` newtype in SQLite as TEXT, so that no precision is lost to REAL columns. Decoding goes through the
/// type's `TryFrom<Decimal>`, so stored values must satisfy the same bounds as any other input.
macro_rules! decimal_text_codec {
    ($for_struct:ident) => {
        impl sqlx::Type<sqlx::Sqlite> for $for_struct {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <String as sqlx::Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $for_struct {
            fn encode_by_ref(&self, buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>) -> sqlx::encode::IsNull {
                <String as sqlx::Encode<'q, sqlx::Sqlite>>::encode(self.0.to_string(), buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $for_struct {
            fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let text = <&str as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value)?;
                let value = rust_decimal::Decimal::from_str_exact(text.trim())?;
                Ok(Self::try_from(value)?)
            }
        }
    };
}

pub(crate) use decimal_text_codec;
