//! Class file writer.
//!
//! [`ClassWriter::write`] turns one [`ObjectDef`] into a class file:
//!
//! ```text
//! ObjectDef ──desugar──► ClassPlan ──lower──► Code attributes
//!                           │                       │
//!                           └── fields, signatures, annotations
//!                                                   ▼
//!                                         constant pool + assemble
//! ```
//!
//! Inner definitions are not written here; each one is an independent
//! class file that the caller emits after its outer definition.

use classgen_core::{AnnotationDef, ObjectDef, QualifiedName, TypeDef};

use crate::class_file::{
    self, ClassFileParts, annotations_payload, assemble, code_payload,
    parameter_annotations_payload, signature_payload,
};
use crate::constant_pool::ConstantPool;
use crate::descriptor::{DescriptorCache, class_signature, is_generic, method_signature, type_signature};
use crate::desugar::{ClassPlan, FieldPlan, MethodPlan};
use crate::lower::{ClassContext, lower_method};
use crate::{EmitError, EmitErrorKind, WriterOptions};

/// A finished class file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedClass {
    pub name: QualifiedName,
    pub bytes: Vec<u8>,
}

/// Writes class files with fixed options.
#[derive(Debug, Clone, Default)]
pub struct ClassWriter {
    options: WriterOptions,
}

impl ClassWriter {
    pub fn new(options: WriterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Emit `def` (without its inner definitions).
    ///
    /// Errors name the definition and, when the failure is inside one, the
    /// member. Nothing is shared between calls, so a failure here never
    /// affects other definitions.
    #[tracing::instrument(level = "debug", skip_all, fields(name = %def.name()))]
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn write(&self, def: &ObjectDef) -> Result<EmittedClass, EmitError> {
        let definition = def.name().to_string();
        let plan = ClassPlan::build(def, &self.options)
            .map_err(|kind| EmitError::new(definition.clone(), None, kind))?;

        let mut state = ClassState {
            plan: &plan,
            options: &self.options,
            pool: ConstantPool::new(),
            descriptors: DescriptorCache::new(),
            context: ClassContext {
                this_type: plan.this_type.clone(),
                is_interface: plan.is_interface(),
                private_methods: plan
                    .methods
                    .iter()
                    .filter(|method| ClassPlan::is_private(method))
                    .map(|method| {
                        ClassContext::method_key(&method.def.name, &method.def.parameter_types())
                    })
                    .collect(),
            },
        };

        let bytes = state.emit().map_err(|(member, kind)| {
            tracing::debug!(member = member.as_deref().unwrap_or("-"), error = %kind, "emission failed");
            EmitError::new(definition.clone(), member, kind)
        })?;

        tracing::debug!(
            bytes = bytes.len(),
            fields = plan.fields.len(),
            methods = plan.methods.len(),
            "class emitted"
        );
        Ok(EmittedClass {
            name: def.name().clone(),
            bytes,
        })
    }
}

type MemberResult<T> = Result<T, (Option<String>, EmitErrorKind)>;

fn at<T>(member: &str, result: Result<T, EmitErrorKind>) -> MemberResult<T> {
    result.map_err(|kind| (Some(member.to_string()), kind))
}

fn class_level<T>(result: Result<T, EmitErrorKind>) -> MemberResult<T> {
    result.map_err(|kind| (None, kind))
}

struct ClassState<'a> {
    plan: &'a ClassPlan,
    options: &'a WriterOptions,
    pool: ConstantPool,
    descriptors: DescriptorCache,
    context: ClassContext,
}

impl ClassState<'_> {
    fn emit(&mut self) -> MemberResult<Vec<u8>> {
        let plan = self.plan;
        let this_class = class_level(self.class_entry(&TypeDef::Class(plan.this_type.clone())))?;
        let super_class = class_level(self.class_entry(&TypeDef::Class(plan.superclass.clone())))?;
        let interfaces = plan
            .interfaces
            .iter()
            .map(|interface| class_level(self.class_entry(&TypeDef::Class(interface.clone()))))
            .collect::<MemberResult<Vec<_>>>()?;

        let fields = plan
            .fields
            .iter()
            .map(|field| self.field(field))
            .collect::<MemberResult<Vec<_>>>()?;
        let methods = plan
            .methods
            .iter()
            .map(|method| self.method(method))
            .collect::<MemberResult<Vec<_>>>()?;
        let attributes = class_level(self.class_attributes())?;

        let parts = ClassFileParts {
            major_version: self.options.major_version,
            access: plan.access,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        };
        Ok(assemble(&self.pool, &parts))
    }

    fn class_entry(&mut self, ty: &TypeDef) -> Result<u16, EmitErrorKind> {
        let name = self.descriptors.class_entry_name(ty);
        self.pool.class(&name)
    }

    fn field(&mut self, field: &FieldPlan) -> MemberResult<Vec<u8>> {
        let def = &field.def;
        let member = def.name.as_str();
        let mut out = Vec::new();
        out.extend_from_slice(&field.access.to_be_bytes());
        let descriptor = self.descriptors.descriptor(&def.ty);
        out.extend_from_slice(&at(member, self.pool.utf8(&def.name))?.to_be_bytes());
        out.extend_from_slice(&at(member, self.pool.utf8(&descriptor))?.to_be_bytes());

        let mut attributes = Vec::new();
        if self.options.emit_signatures && is_generic(&def.ty) {
            let payload = at(member, signature_payload(&mut self.pool, &type_signature(&def.ty)))?;
            attributes.push(at(member, self.attribute("Signature", &payload))?);
        }
        if let Some(attribute) = at(member, self.annotations(&def.annotations))? {
            attributes.push(attribute);
        }
        write_attributes(&mut out, &attributes);
        Ok(out)
    }

    fn method(&mut self, method: &MethodPlan) -> MemberResult<Vec<u8>> {
        let def = &method.def;
        let member = def.signature();
        let result = self.method_info(method);
        at(&member, result)
    }

    fn method_info(&mut self, method: &MethodPlan) -> Result<Vec<u8>, EmitErrorKind> {
        let def = &method.def;
        let parameters = def.parameter_types();
        let descriptor = self
            .descriptors
            .method_descriptor(&parameters, &def.return_type);

        let mut out = Vec::new();
        out.extend_from_slice(&method.access.to_be_bytes());
        out.extend_from_slice(&self.pool.utf8(&def.name)?.to_be_bytes());
        out.extend_from_slice(&self.pool.utf8(&descriptor)?.to_be_bytes());

        let mut attributes = Vec::new();
        if def.has_body() {
            let code = lower_method(
                &self.context,
                &mut self.pool,
                &mut self.descriptors,
                self.options,
                def,
            )?;
            tracing::trace!(
                method = %def.name,
                code = code.code.len(),
                max_stack = code.max_stack,
                max_locals = code.max_locals,
                "method lowered"
            );
            attributes.push(self.attribute("Code", &code_payload(&code))?);
        }

        let generic = !def.type_parameters.is_empty()
            || parameters.iter().any(is_generic)
            || is_generic(&def.return_type);
        if self.options.emit_signatures && generic {
            let signature = method_signature(&def.type_parameters, &parameters, &def.return_type);
            let payload = signature_payload(&mut self.pool, &signature)?;
            attributes.push(self.attribute("Signature", &payload)?);
        }
        if let Some(attribute) = self.annotations(&def.annotations)? {
            attributes.push(attribute);
        }
        if self.options.emit_annotations
            && def.parameters.iter().any(|p| !p.annotations.is_empty())
        {
            let per_parameter: Vec<&[AnnotationDef]> = def
                .parameters
                .iter()
                .map(|p| p.annotations.as_slice())
                .collect();
            let payload =
                parameter_annotations_payload(&mut self.pool, &mut self.descriptors, &per_parameter)?;
            attributes.push(self.attribute("RuntimeVisibleParameterAnnotations", &payload)?);
        }
        write_attributes(&mut out, &attributes);
        Ok(out)
    }

    fn class_attributes(&mut self) -> Result<Vec<Vec<u8>>, EmitErrorKind> {
        let plan = self.plan;
        let mut attributes = Vec::new();
        let generic = !plan.type_parameters.is_empty()
            || plan.superclass.is_parameterized()
            || plan.interfaces.iter().any(|i| i.is_parameterized());
        if self.options.emit_signatures && generic {
            let signature = class_signature(&plan.type_parameters, &plan.superclass, &plan.interfaces);
            let payload = signature_payload(&mut self.pool, &signature)?;
            attributes.push(self.attribute("Signature", &payload)?);
        }
        if let Some(attribute) = self.annotations(&plan.annotations)? {
            attributes.push(attribute);
        }
        Ok(attributes)
    }

    fn annotations(&mut self, annotations: &[AnnotationDef]) -> Result<Option<Vec<u8>>, EmitErrorKind> {
        if !self.options.emit_annotations || annotations.is_empty() {
            return Ok(None);
        }
        let payload = annotations_payload(&mut self.pool, &mut self.descriptors, annotations)?;
        self.attribute("RuntimeVisibleAnnotations", &payload).map(Some)
    }

    fn attribute(&mut self, name: &str, payload: &[u8]) -> Result<Vec<u8>, EmitErrorKind> {
        let mut out = Vec::with_capacity(payload.len() + 6);
        class_file::write_attribute(&mut out, &mut self.pool, name, payload)?;
        Ok(out)
    }
}

fn write_attributes(out: &mut Vec<u8>, attributes: &[Vec<u8>]) {
    out.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
    for attribute in attributes {
        out.extend_from_slice(attribute);
    }
}
