//! Build-plugin task metadata.
//!
//! A task type marks its parameters with `PluginTaskParameter` and its
//! entry point with `PluginTaskExecutable`. The readers here turn those
//! annotations into validated configuration for task generators.

use classgen_core::{
    AnnotationValue, MethodElement, PropertyElement, QualifiedName, TypeDef, TypeElement, TypeKind,
};

use crate::error::ConfigError;

pub const ANNOTATION_PACKAGE: &str = "classgen.annotations";

/// Annotation carrying per-parameter configuration.
pub fn parameter_annotation() -> QualifiedName {
    QualifiedName::new(ANNOTATION_PACKAGE, "PluginTaskParameter")
}

/// Annotation marking the method that runs the task.
pub fn executable_annotation() -> QualifiedName {
    QualifiedName::new(ANNOTATION_PACKAGE, "PluginTaskExecutable")
}

/// Configuration of one task parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterConfig {
    pub name: String,
    pub ty: TypeDef,
    pub required: bool,
    /// Only allowed for primitive, enum and string parameters.
    pub default_value: Option<String>,
    /// Excluded from the generated public surface.
    pub internal: bool,
    pub directory: bool,
    pub output: bool,
    /// Global property the value can be read from.
    pub global_property: Option<String>,
}

fn flag(property: &PropertyElement, member: &str) -> bool {
    matches!(
        property.annotation_value(&parameter_annotation(), member),
        Some(AnnotationValue::Boolean(true))
    )
}

fn text(property: &PropertyElement, member: &str) -> Option<String> {
    property
        .annotation_value(&parameter_annotation(), member)
        .and_then(|value| value.as_string())
        .filter(|value| !value.is_empty())
}

impl ParameterConfig {
    /// Read the configuration of `property`. Unannotated properties get
    /// the defaults.
    pub fn from_element(property: &PropertyElement) -> Self {
        Self {
            name: property.name.clone(),
            ty: property.ty.clone(),
            required: flag(property, "required"),
            default_value: text(property, "defaultValue"),
            internal: flag(property, "internal"),
            directory: flag(property, "directory"),
            output: flag(property, "output"),
            global_property: text(property, "globalProperty"),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.internal && self.required {
            return Err(ConfigError::InternalAndRequired {
                parameter: self.name.clone(),
            });
        }
        if self.default_value.is_some() {
            if self.required {
                return Err(ConfigError::DefaultAndRequired {
                    parameter: self.name.clone(),
                });
            }
            if !accepts_default(&self.ty) {
                return Err(ConfigError::DefaultOnUnsupportedType {
                    parameter: self.name.clone(),
                    ty: describe(&self.ty),
                });
            }
        }
        Ok(())
    }
}

fn accepts_default(ty: &TypeDef) -> bool {
    if ty.is_primitive() || ty.boxed_kind().is_some() {
        return true;
    }
    match ty.as_class() {
        Some(class) => {
            class.kind() == TypeKind::Enum || class.resolve() == QualifiedName::new("java.lang", "String")
        }
        None => false,
    }
}

fn describe(ty: &TypeDef) -> String {
    match ty.as_class() {
        Some(class) => class.resolve().to_string(),
        None => format!("{ty:?}"),
    }
}

/// Validated configuration of every property of `task`, in declaration
/// order.
pub fn task_parameters(task: &dyn TypeElement) -> Result<Vec<ParameterConfig>, ConfigError> {
    task.properties()
        .iter()
        .map(|property| {
            let config = ParameterConfig::from_element(property);
            config.validate()?;
            Ok(config)
        })
        .collect()
}

/// The single method of `task` that runs it. It must take no parameters
/// and return void.
pub fn find_task_executable(task: &dyn TypeElement) -> Result<MethodElement, ConfigError> {
    let marker = executable_annotation();
    let mut executables: Vec<MethodElement> = task
        .methods()
        .into_iter()
        .filter(|method| method.has_annotation(&marker))
        .collect();

    let executable = match executables.len() {
        1 => executables.remove(0),
        found => {
            return Err(ConfigError::ExecutableCount {
                task: task.name().to_string(),
                found,
            });
        }
    };
    if !executable.parameter_types.is_empty() {
        return Err(ConfigError::ExecutableParameters {
            task: task.name().to_string(),
            method: executable.name,
        });
    }
    if !executable.return_type.is_void() {
        return Err(ConfigError::ExecutableReturn {
            task: task.name().to_string(),
            method: executable.name,
        });
    }
    Ok(executable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use classgen_core::{AnnotationDef, ClassTypeDef, DescribedType};

    fn parameter(members: Vec<(&str, AnnotationValue)>) -> AnnotationDef {
        let mut builder = AnnotationDef::builder(ClassTypeDef::of(parameter_annotation()));
        for (name, value) in members {
            builder = builder.add_member(name, value);
        }
        builder.build()
    }

    fn property(name: &str, ty: TypeDef, annotations: Vec<AnnotationDef>) -> PropertyElement {
        PropertyElement {
            name: name.into(),
            ty,
            annotations,
        }
    }

    fn method(name: &str, parameters: Vec<TypeDef>, ret: TypeDef, executable: bool) -> MethodElement {
        let annotations = if executable {
            vec![AnnotationDef::marker(ClassTypeDef::of(executable_annotation()))]
        } else {
            vec![]
        };
        MethodElement {
            name: name.into(),
            parameter_types: parameters,
            return_type: ret,
            annotations,
        }
    }

    fn task() -> QualifiedName {
        QualifiedName::new("demo", "GenerateTask")
    }

    #[test]
    fn unannotated_property_gets_defaults() {
        let config = ParameterConfig::from_element(&property("name", TypeDef::string(), vec![]));
        assert!(!config.required);
        assert!(!config.internal);
        assert_eq!(config.default_value, None);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn reads_annotation_members() {
        let config = ParameterConfig::from_element(&property(
            "outputDir",
            TypeDef::string(),
            vec![parameter(vec![
                ("required", AnnotationValue::Boolean(true)),
                ("directory", AnnotationValue::Boolean(true)),
                ("output", AnnotationValue::Boolean(true)),
                ("globalProperty", AnnotationValue::String("out".into())),
            ])],
        ));
        assert!(config.required && config.directory && config.output);
        assert_eq!(config.global_property.as_deref(), Some("out"));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rejects_conflicting_flags() {
        let internal_required = ParameterConfig::from_element(&property(
            "secret",
            TypeDef::INT,
            vec![parameter(vec![
                ("internal", AnnotationValue::Boolean(true)),
                ("required", AnnotationValue::Boolean(true)),
            ])],
        ));
        assert!(matches!(
            internal_required.validate(),
            Err(ConfigError::InternalAndRequired { .. })
        ));

        let default_required = ParameterConfig::from_element(&property(
            "count",
            TypeDef::INT,
            vec![parameter(vec![
                ("defaultValue", AnnotationValue::String("3".into())),
                ("required", AnnotationValue::Boolean(true)),
            ])],
        ));
        assert!(matches!(
            default_required.validate(),
            Err(ConfigError::DefaultAndRequired { .. })
        ));
    }

    #[test]
    fn default_values_need_simple_types() {
        let with_default = |ty: TypeDef| {
            ParameterConfig::from_element(&property(
                "p",
                ty,
                vec![parameter(vec![(
                    "defaultValue",
                    AnnotationValue::String("x".into()),
                )])],
            ))
            .validate()
        };
        assert_eq!(with_default(TypeDef::BOOLEAN), Ok(()));
        assert_eq!(with_default(TypeDef::string()), Ok(()));
        let mode = ClassTypeDef::of_kind(QualifiedName::new("demo", "Mode"), TypeKind::Enum);
        assert_eq!(with_default(TypeDef::Class(mode)), Ok(()));
        assert!(matches!(
            with_default(TypeDef::of(QualifiedName::new("java.util", "List"))),
            Err(ConfigError::DefaultOnUnsupportedType { .. })
        ));
    }

    #[test]
    fn finds_single_executable() {
        let element = DescribedType::new(task())
            .with_method(method("helper", vec![], TypeDef::INT, false))
            .with_method(method("run", vec![], TypeDef::Void, true));
        assert_eq!(find_task_executable(&element).unwrap().name, "run");
    }

    #[test]
    fn executable_shape_is_checked() {
        let none = DescribedType::new(task());
        assert_eq!(
            find_task_executable(&none),
            Err(ConfigError::ExecutableCount {
                task: "demo.GenerateTask".into(),
                found: 0
            })
        );

        let two = DescribedType::new(task())
            .with_method(method("a", vec![], TypeDef::Void, true))
            .with_method(method("b", vec![], TypeDef::Void, true));
        assert!(matches!(
            find_task_executable(&two),
            Err(ConfigError::ExecutableCount { found: 2, .. })
        ));

        let with_parameter = DescribedType::new(task())
            .with_method(method("run", vec![TypeDef::INT], TypeDef::Void, true));
        assert!(matches!(
            find_task_executable(&with_parameter),
            Err(ConfigError::ExecutableParameters { .. })
        ));

        let returning = DescribedType::new(task())
            .with_method(method("run", vec![], TypeDef::INT, true));
        assert!(matches!(
            find_task_executable(&returning),
            Err(ConfigError::ExecutableReturn { .. })
        ));
    }

    #[test]
    fn task_parameters_validate_all() {
        let element = DescribedType::new(task())
            .with_property(property("first", TypeDef::INT, vec![]))
            .with_property(property(
                "second",
                TypeDef::INT,
                vec![parameter(vec![
                    ("internal", AnnotationValue::Boolean(true)),
                    ("required", AnnotationValue::Boolean(true)),
                ])],
            ));
        assert!(task_parameters(&element).is_err());

        let valid = DescribedType::new(task()).with_property(property("first", TypeDef::INT, vec![]));
        let names: Vec<_> = task_parameters(&valid)
            .unwrap()
            .into_iter()
            .map(|config| config.name)
            .collect();
        assert_eq!(names, ["first"]);
    }
}
