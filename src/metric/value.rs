//! Conversion of primitive values into metric values.

use super::MetricError;

/// A value that can be recorded as a metric sample.
///
/// `Ok(None)` means there is nothing to record and the sample is skipped.
pub trait ToMetricValue {
    fn to_metric_value(&self) -> Result<Option<f64>, MetricError>;
}

macro_rules! impl_numeric {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToMetricValue for $ty {
                fn to_metric_value(&self) -> Result<Option<f64>, MetricError> {
                    Ok(Some(*self as f64))
                }
            }
        )*
    };
}

impl_numeric!(f64, f32, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl ToMetricValue for bool {
    fn to_metric_value(&self) -> Result<Option<f64>, MetricError> {
        Ok(Some(if *self { 1.0 } else { 0.0 }))
    }
}

impl ToMetricValue for str {
    fn to_metric_value(&self) -> Result<Option<f64>, MetricError> {
        self.trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| MetricError::InvalidValue(format!("'{}': {}", self, e)))
    }
}

impl ToMetricValue for String {
    fn to_metric_value(&self) -> Result<Option<f64>, MetricError> {
        self.as_str().to_metric_value()
    }
}

impl<T: ToMetricValue + ?Sized> ToMetricValue for &T {
    fn to_metric_value(&self) -> Result<Option<f64>, MetricError> {
        (**self).to_metric_value()
    }
}

impl<T: ToMetricValue> ToMetricValue for Option<T> {
    fn to_metric_value(&self) -> Result<Option<f64>, MetricError> {
        match self {
            Some(value) => value.to_metric_value(),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_conversions() {
        assert_eq!(7_u8.to_metric_value().unwrap(), Some(7.0));
        assert_eq!((-3_i64).to_metric_value().unwrap(), Some(-3.0));
        assert_eq!(0.5_f32.to_metric_value().unwrap(), Some(0.5));
        assert_eq!(true.to_metric_value().unwrap(), Some(1.0));
    }

    #[test]
    fn test_string_conversions() {
        assert_eq!("42".to_metric_value().unwrap(), Some(42.0));
        assert_eq!(" 1.5 ".to_string().to_metric_value().unwrap(), Some(1.5));
        assert!("n/a".to_metric_value().is_err());
    }

    #[test]
    fn test_option_conversions() {
        assert_eq!(None::<u32>.to_metric_value().unwrap(), None);
        assert_eq!(Some(3_u32).to_metric_value().unwrap(), Some(3.0));
        assert_eq!((&Some(2_i32)).to_metric_value().unwrap(), Some(2.0));
    }
}
