use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// Wire format of a bucket: a plain calendar date.
pub const BUCKET_FORMAT: &str = "%Y-%m-%d";

/// One calendar-day sampling interval. No time of day, no timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateBucket(NaiveDate);

impl DateBucket {
    pub fn new(date: NaiveDate) -> Self {
        DateBucket(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Exposition timestamp: midnight UTC of the bucket date, in milliseconds.
    pub fn timestamp_millis(&self) -> i64 {
        self.0.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
    }
}

impl From<NaiveDate> for DateBucket {
    fn from(date: NaiveDate) -> Self {
        DateBucket(date)
    }
}

impl FromStr for DateBucket {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, BUCKET_FORMAT).map(DateBucket)
    }
}

impl fmt::Display for DateBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(BUCKET_FORMAT))
    }
}

impl Serialize for DateBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct DateBucketVisitor;

impl Visitor<'_> for DateBucketVisitor {
    type Value = DateBucket;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a date in YYYY-MM-DD form")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<DateBucket, E> {
        // chrono accepts unpadded fields, the provider never sends them
        if v.len() != 10 {
            return Err(E::invalid_value(de::Unexpected::Str(v), &self));
        }
        v.parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for DateBucket {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(DateBucketVisitor)
    }
}
