//! 核心宏定义
//!
//! 配置结构体的默认值统一由宏生成，避免手写样板代码。

/// 为配置结构体实现 Default trait 的宏
///
/// 使用示例:
/// ```rust
/// use bullet_storm::impl_default;
///
/// struct PulseSettings {
///     fixed_step: f32,
///     label: String,
/// }
///
/// impl_default!(PulseSettings {
///     fixed_step: 1.0 / 60.0,
///     label: String::from("fixed"),
/// });
///
/// assert_eq!(PulseSettings::default().label, "fixed");
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}
