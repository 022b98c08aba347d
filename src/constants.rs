//! Named constants with a distinct wire value.
//!
//! Every constant has a symbolic name (`BASC`) and an underlying value
//! (`bacs_debit`). Instances compare by type and value, print and serialize
//! as the value, and parse from the name. [`base_constant!`] generates the
//! enum and its trait impls from one table.

use std::any::Any;
use std::fmt;

use crate::error::ConstantError;

/// Closed set of (name, value) pairs.
pub trait BaseConstant: Copy + Eq + fmt::Debug + 'static {
    /// Type label used in error messages.
    const KIND: &'static str;

    /// Every constant, in declaration order.
    fn all() -> &'static [Self];

    fn name(&self) -> &'static str;

    fn get_value(&self) -> &'static str;

    /// Constant by symbolic name.
    fn from_name(name: &str) -> Result<Self, ConstantError> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.name() == name)
            .ok_or_else(|| ConstantError::UnknownName {
                kind: Self::KIND,
                name: name.to_string(),
            })
    }

    /// Constant by underlying value.
    fn from_value(value: &str) -> Result<Self, ConstantError> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.get_value() == value)
            .ok_or_else(|| ConstantError::UnknownValue {
                kind: Self::KIND,
                value: value.to_string(),
            })
    }

    /// Reverse lookup: name of the constant holding `value`.
    fn search(value: &str) -> Result<&'static str, ConstantError> {
        Self::from_value(value).map(|c| c.name())
    }

    /// Same concrete type and same value. Anything else is unequal.
    fn equals(&self, other: &dyn Any) -> bool {
        other
            .downcast_ref::<Self>()
            .is_some_and(|o| o.get_value() == self.get_value())
    }
}

/// Declare a [`BaseConstant`] enum.
///
/// ```ignore
/// base_constant! {
///     pub enum PaymentType {
///         Single: "SINGLE" => "single",
///         Recurring: "RECURRING" => "recurring",
///     }
/// }
/// ```
#[macro_export]
macro_rules! base_constant {
    (
        $(#[$meta:meta])*
        $vis:vis enum $ty:ident {
            $( $(#[$vmeta:meta])* $variant:ident : $name:literal => $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $ty {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $crate::constants::BaseConstant for $ty {
            const KIND: &'static str = stringify!($ty);

            fn all() -> &'static [Self] {
                &[ $( $ty::$variant ),+ ]
            }

            fn name(&self) -> &'static str {
                match self {
                    $( $ty::$variant => $name ),+
                }
            }

            fn get_value(&self) -> &'static str {
                match self {
                    $( $ty::$variant => $value ),+
                }
            }
        }

        impl ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::constants::BaseConstant::get_value(self))
            }
        }

        impl ::std::str::FromStr for $ty {
            type Err = $crate::error::ConstantError;

            fn from_str(name: &str) -> ::std::result::Result<Self, Self::Err> {
                <Self as $crate::constants::BaseConstant>::from_name(name)
            }
        }

        impl ::std::convert::AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                $crate::constants::BaseConstant::get_value(self)
            }
        }

        impl ::serde::Serialize for $ty {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str($crate::constants::BaseConstant::get_value(self))
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $ty {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> ::std::result::Result<Self, D::Error> {
                let value = <::std::string::String as ::serde::Deserialize>::deserialize(deserializer)?;
                <Self as $crate::constants::BaseConstant>::from_value(&value)
                    .map_err(<D::Error as ::serde::de::Error>::custom)
            }
        }
    };
}

// =============================================================================
// Payment constants
// =============================================================================

base_constant! {
    /// Payment method types accepted by the processor.
    pub enum PaymentMethod {
        Card: "CARD" => "card",
        Basc: "BASC" => "bacs_debit",
        Becs: "BECS" => "au_becs_debit",
        Bancontact: "BANCONTACT" => "bancontact",
        Eps: "EPS" => "eps",
        Giropay: "GIROPAY" => "giropay",
        Ideal: "IDEAL" => "ideal",
        Link: "LINK" => "link",
        P24: "P24" => "p24",
        Sepa: "SEPA" => "sepa_debit",
        Sofort: "SOFORT" => "sofort",
        UsBankAccount: "US_BANK_ACCOUNT" => "us_bank_account",
        Affirm: "AFFIRM" => "affirm",
        Afterpay: "AFTERPAY" => "afterpay_clearpay",
        Klarna: "KLARNA" => "klarna",
    }
}

base_constant! {
    pub enum PaymentType {
        Single: "SINGLE" => "single",
        Recurring: "RECURRING" => "recurring",
    }
}

base_constant! {
    /// Who started the payment.
    pub enum PaymentInitiatedBy {
        Merchant: "MERCHANT" => "initiated_by_merchant",
        Customer: "CUSTOMER" => "initiated_by_customer",
    }
}

base_constant! {
    pub enum PaymentCaptureType {
        Automatic: "AUTOMATIC" => "automatic",
        Manual: "MANUAL" => "manual",
    }
}

base_constant! {
    /// Lifecycle status of a payment intent.
    pub enum IntentStatus {
        RequiresPaymentMethod: "REQUIRES_PAYMENT_METHOD" => "requires_payment_method",
        RequiresConfirmation: "REQUIRES_CONFIRMATION" => "requires_confirmation",
        RequiresAction: "REQUIRES_ACTION" => "requires_action",
        Processing: "PROCESSING" => "processing",
        RequiresCapture: "REQUIRES_CAPTURE" => "requires_capture",
        Canceled: "CANCELED" => "canceled",
        Succeeded: "SUCCEEDED" => "succeeded",
    }
}

// =============================================================================
// Cache slots
// =============================================================================

base_constant! {
    /// Well-known `DatabaseCache` slots. The value is the option name.
    pub enum CacheKey {
        Account: "ACCOUNT_KEY" => "wcpay_account_data",
        BusinessTypes: "BUSINESS_TYPES_KEY" => "wcpay_business_types_data",
        Currencies: "CURRENCIES_KEY" => "wcpay_multi_currency_cached_currencies",
        CustomerCurrencies: "CUSTOMER_CURRENCIES_KEY" => "wcpay_multi_currency_customer_currencies",
        PaymentProcessFactors: "PAYMENT_PROCESS_FACTORS_KEY" => "wcpay_payment_process_factors",
        FraudServices: "FRAUD_SERVICES_KEY" => "wcpay_fraud_services_data",
        RecommendedPaymentMethods: "RECOMMENDED_PAYMENT_METHODS" => "wcpay_recommended_payment_methods",
        TrackingInfo: "TRACKING_INFO_KEY" => "wcpay_tracking_info_cache",
    }
}

/// Resolve `input` as a name or a value within the constant set called `set`.
///
/// Returns `(name, value)`. Used by the CLI.
pub fn lookup(set: &str, input: &str) -> Result<(&'static str, &'static str), ConstantError> {
    fn resolve<T: BaseConstant>(input: &str) -> Result<(&'static str, &'static str), ConstantError> {
        let constant = T::from_name(input).or_else(|_| T::from_value(input))?;
        Ok((constant.name(), constant.get_value()))
    }

    match set {
        "payment-method" => resolve::<PaymentMethod>(input),
        "payment-type" => resolve::<PaymentType>(input),
        "initiated-by" => resolve::<PaymentInitiatedBy>(input),
        "capture-type" => resolve::<PaymentCaptureType>(input),
        "intent-status" => resolve::<IntentStatus>(input),
        "cache-key" => resolve::<CacheKey>(input),
        _ => Err(ConstantError::UnknownName {
            kind: "constant set",
            name: set.to_string(),
        }),
    }
}

/// Names accepted by [`lookup`].
pub const CONSTANT_SETS: &[&str] = &[
    "payment-method",
    "payment-type",
    "initiated-by",
    "capture-type",
    "intent-status",
    "cache-key",
];
