/// Declares an operation struct holding its request config and the object
/// store it runs against, with a builder for both.
#[macro_export]
macro_rules! define_operation_struct {
    ($name:ident, $config_name:ident) => {
        #[derive(::builder_pattern::Builder)]
        pub struct $name {
            #[public]
            config: $config_name,
            #[public]
            store: $crate::api::SharedStore,
        }

        impl $crate::api::Sealed for $name {}
    };
}
