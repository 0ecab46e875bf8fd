use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::ir::adapter;
use crate::ir::cfg::Cfg;

/// A symbol in the analyzed program (function name, call target)
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A program variable, interned into the registry
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct Variable(usize);

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Static (or soundly inferred) type of a variable
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum VarType {
    Int,
    Float,
    Unknown,
}

impl VarType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

impl From<adapter::Type> for VarType {
    fn from(ty: adapter::Type) -> Self {
        match ty {
            adapter::Type::Int => Self::Int,
            adapter::Type::Float => Self::Float,
            adapter::Type::Unknown => Self::Unknown,
        }
    }
}

/// Keeps track of all variables mentioned by a program
#[derive(Default)]
pub struct VariableRegistry {
    decls: Vec<(String, VarType)>,
    index: BTreeMap<String, Variable>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a variable, refining its type if previously unknown
    pub fn intern(&mut self, name: &str, ty: VarType) -> Variable {
        match self.index.get(name) {
            Some(var) => {
                let slot = &mut self.decls[var.0];
                if slot.1 == VarType::Unknown {
                    slot.1 = ty;
                }
                *var
            }
            None => {
                let var = Variable(self.decls.len());
                self.decls.push((name.to_string(), ty));
                self.index.insert(name.to_string(), var);
                var
            }
        }
    }

    pub fn name(&self, var: Variable) -> &str {
        &self.decls[var.0].0
    }

    pub fn var_type(&self, var: Variable) -> VarType {
        self.decls[var.0].1
    }
}

/// A literal constant
///
/// Floating literals are stored by bit pattern so that expressions stay
/// hashable and structurally comparable.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Constant {
    Int(i64),
    Float(u64),
}

impl Constant {
    pub fn float(value: f64) -> Self {
        Self::Float(value.to_bits())
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Int(v) => *v as f64,
            Self::Float(bits) => f64::from_bits(*bits),
        }
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum UnOp {
    Neg,
}

impl Display for UnOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Neg => write!(f, "-"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Display for BinOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let repr = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        };
        write!(f, "{}", repr)
    }
}

/// A side-effect-annotated expression tree
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Expr {
    Const(Constant),
    Var(Variable),
    Unary {
        op: UnOp,
        arg: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: Identifier,
        args: Vec<Expr>,
    },
    /// A value the front-end cannot model (external input, havoc)
    Unknown,
}

impl Expr {
    pub fn int(value: i64) -> Self {
        Self::Const(Constant::Int(value))
    }

    pub fn var(var: Variable) -> Self {
        Self::Var(var)
    }

    pub fn unary(op: UnOp, arg: Expr) -> Self {
        Self::Unary {
            op,
            arg: Box::new(arg),
        }
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn call(callee: impl Into<Identifier>, args: Vec<Expr>) -> Self {
        Self::Call {
            callee: callee.into(),
            args,
        }
    }

    /// All variables referenced anywhere in this expression
    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut result = BTreeSet::new();
        self.collect_variables(&mut result);
        result
    }

    fn collect_variables(&self, result: &mut BTreeSet<Variable>) {
        match self {
            Self::Const(..) | Self::Unknown => (),
            Self::Var(var) => {
                result.insert(*var);
            }
            Self::Unary { arg, .. } => arg.collect_variables(result),
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_variables(result);
                rhs.collect_variables(result);
            }
            Self::Call { args, .. } => {
                for arg in args {
                    arg.collect_variables(result);
                }
            }
        }
    }

    /// Whether this expression is a non-trivial, side-effect-free computation
    ///
    /// Bare variables and constants need not be computed; calls and unknown
    /// values are not side-effect-free. Only such trees qualify as dataflow
    /// facts for the available-expressions analysis.
    pub fn is_computation(&self) -> bool {
        matches!(self, Self::Unary { .. } | Self::Binary { .. }) && self.is_pure()
    }

    fn is_pure(&self) -> bool {
        match self {
            Self::Const(..) | Self::Var(..) => true,
            Self::Unknown => false,
            Self::Unary { arg, .. } => arg.is_pure(),
            Self::Binary { lhs, rhs, .. } => lhs.is_pure() && rhs.is_pure(),
            Self::Call { .. } => false,
        }
    }

    /// Collect the divisor sub-expressions of every division in this tree
    pub fn divisors(&self) -> Vec<&Expr> {
        let mut result = vec![];
        self.collect_divisors(&mut result);
        result
    }

    fn collect_divisors<'a>(&'a self, result: &mut Vec<&'a Expr>) {
        match self {
            Self::Const(..) | Self::Var(..) | Self::Unknown => (),
            Self::Unary { arg, .. } => arg.collect_divisors(result),
            Self::Binary { op, lhs, rhs } => {
                lhs.collect_divisors(result);
                rhs.collect_divisors(result);
                if matches!(op, BinOp::Div) {
                    result.push(rhs);
                }
            }
            Self::Call { args, .. } => {
                for arg in args {
                    arg.collect_divisors(result);
                }
            }
        }
    }

    /// Collect every call appearing in this tree
    pub fn calls(&self) -> Vec<(&Identifier, &[Expr])> {
        let mut result = vec![];
        self.collect_calls(&mut result);
        result
    }

    fn collect_calls<'a>(&'a self, result: &mut Vec<(&'a Identifier, &'a [Expr])>) {
        match self {
            Self::Const(..) | Self::Var(..) | Self::Unknown => (),
            Self::Unary { arg, .. } => arg.collect_calls(result),
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_calls(result);
                rhs.collect_calls(result);
            }
            Self::Call { callee, args } => {
                for arg in args {
                    arg.collect_calls(result);
                }
                result.push((callee, args));
            }
        }
    }

    /// Render the expression with variable names resolved
    pub fn render(&self, vars: &VariableRegistry) -> String {
        match self {
            Self::Const(c) => c.to_string(),
            Self::Var(var) => vars.name(*var).to_string(),
            Self::Unary { op, arg } => format!("{}{}", op, arg.render(vars)),
            Self::Binary { op, lhs, rhs } => {
                format!("({} {} {})", lhs.render(vars), op, rhs.render(vars))
            }
            Self::Call { callee, args } => {
                let rendered: Vec<_> = args.iter().map(|a| a.render(vars)).collect();
                format!("{}({})", callee, rendered.join(", "))
            }
            Self::Unknown => "<unknown>".to_string(),
        }
    }
}

/// One statement owned by a CFG node
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Stmt {
    Assign { var: Variable, expr: Expr },
    Assume { cond: Expr },
    Eval { expr: Expr },
    Return { expr: Option<Expr> },
    Skip,
}

impl Stmt {
    /// The variable written by this statement, if any (at most one)
    pub fn written(&self) -> Option<Variable> {
        match self {
            Self::Assign { var, .. } => Some(*var),
            _ => None,
        }
    }

    /// The expression computed by this statement, if any
    pub fn expr(&self) -> Option<&Expr> {
        match self {
            Self::Assign { expr, .. } => Some(expr),
            Self::Assume { cond } => Some(cond),
            Self::Eval { expr } => Some(expr),
            Self::Return { expr } => expr.as_ref(),
            Self::Skip => None,
        }
    }

    /// The variables read by this statement
    pub fn reads(&self) -> BTreeSet<Variable> {
        self.expr().map(Expr::variables).unwrap_or_default()
    }
}

/// Source position of a program point
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Label of a CFG node, unique within one function
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct NodeLabel(pub usize);

impl Display for NodeLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A program point: one statement at one location
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Node {
    pub label: NodeLabel,
    pub loc: Location,
    pub stmt: Stmt,
}

/// A function of the analyzed program
pub struct Function {
    pub name: Identifier,
    pub params: Vec<Variable>,
    /// body of the function (in terms of a CFG); None for external targets
    pub body: Option<Cfg>,
}

/// A whole program: the variable registry plus all functions
pub struct Program {
    pub vars: VariableRegistry,
    pub functions: BTreeMap<Identifier, Function>,
}

impl Program {
    pub fn new(vars: VariableRegistry) -> Self {
        Self {
            vars,
            functions: BTreeMap::new(),
        }
    }

    pub fn add_function(&mut self, function: Function) -> EngineResult<()> {
        let name = function.name.clone();
        if self.functions.insert(name.clone(), function).is_some() {
            return Err(EngineError::InvalidProgram(format!(
                "duplicated function: {}",
                name
            )));
        }
        Ok(())
    }

    pub fn function(&self, name: &Identifier) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Convert a deserialized program into the analysis representation
    pub fn convert(adapted: &adapter::Program) -> EngineResult<Self> {
        let mut vars = VariableRegistry::new();
        for decl in &adapted.variables {
            vars.intern(&decl.name, decl.ty.into());
        }

        let mut program = Program::new(vars);
        for function in &adapted.functions {
            let converted = convert_function(function, &mut program.vars)?;
            program.add_function(converted)?;
        }
        Ok(program)
    }
}

fn convert_function(
    adapted: &adapter::Function,
    vars: &mut VariableRegistry,
) -> EngineResult<Function> {
    let params = adapted
        .params
        .iter()
        .map(|name| vars.intern(name, VarType::Unknown))
        .collect();
    let body = match &adapted.body {
        None => None,
        Some(body) => Some(Cfg::convert(body, vars)?),
    };
    Ok(Function {
        name: adapted.name.as_str().into(),
        params,
        body,
    })
}

pub(crate) fn convert_stmt(
    adapted: &adapter::Stmt,
    vars: &mut VariableRegistry,
) -> EngineResult<Stmt> {
    let converted = match adapted {
        adapter::Stmt::Assign { var, expr } => Stmt::Assign {
            var: vars.intern(var, VarType::Unknown),
            expr: convert_expr(expr, vars)?,
        },
        adapter::Stmt::Assume { cond } => Stmt::Assume {
            cond: convert_expr(cond, vars)?,
        },
        adapter::Stmt::Eval { expr } => Stmt::Eval {
            expr: convert_expr(expr, vars)?,
        },
        adapter::Stmt::Return { expr } => Stmt::Return {
            expr: match expr {
                None => None,
                Some(expr) => Some(convert_expr(expr, vars)?),
            },
        },
        adapter::Stmt::Skip => Stmt::Skip,
    };
    Ok(converted)
}

fn convert_expr(adapted: &adapter::Expr, vars: &mut VariableRegistry) -> EngineResult<Expr> {
    let converted = match adapted {
        adapter::Expr::Int { value } => Expr::Const(Constant::Int(*value)),
        adapter::Expr::Float { value } => Expr::Const(Constant::float(*value)),
        adapter::Expr::Var { name } => Expr::Var(vars.intern(name, VarType::Unknown)),
        adapter::Expr::Unary { op, arg } => {
            let op = match op.as_str() {
                "-" | "neg" => UnOp::Neg,
                _ => {
                    return Err(EngineError::InvalidProgram(format!(
                        "unknown unary operator: {}",
                        op
                    )));
                }
            };
            Expr::unary(op, convert_expr(arg, vars)?)
        }
        adapter::Expr::Binary { op, lhs, rhs } => {
            let op = match op.as_str() {
                "+" => BinOp::Add,
                "-" => BinOp::Sub,
                "*" => BinOp::Mul,
                "/" => BinOp::Div,
                "<" => BinOp::Lt,
                "<=" => BinOp::Le,
                ">" => BinOp::Gt,
                ">=" => BinOp::Ge,
                "==" => BinOp::Eq,
                "!=" => BinOp::Ne,
                _ => {
                    return Err(EngineError::InvalidProgram(format!(
                        "unknown binary operator: {}",
                        op
                    )));
                }
            };
            Expr::binary(op, convert_expr(lhs, vars)?, convert_expr(rhs, vars)?)
        }
        adapter::Expr::Call { callee, args } => {
            let args = args
                .iter()
                .map(|arg| convert_expr(arg, vars))
                .collect::<EngineResult<_>>()?;
            Expr::Call {
                callee: callee.as_str().into(),
                args,
            }
        }
        adapter::Expr::Unknown => Expr::Unknown,
    };
    Ok(converted)
}
