use serde::Deserialize;

/// A naive deserialization of a program handed over by a front-end
#[derive(Deserialize)]
pub struct Program {
    #[serde(default)]
    pub variables: Vec<Variable>,
    pub functions: Vec<Function>,
}

/// A variable declaration with optional type information
#[derive(Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default)]
    pub ty: Type,
}

/// Static type of a variable, when the front-end knows it
#[derive(Copy, Clone, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Int,
    Float,
    #[default]
    Unknown,
}

/// A function with an optional control-flow graph
#[derive(Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub body: Option<Body>,
}

/// The control-flow graph of one function
#[derive(Deserialize)]
pub struct Body {
    pub entry: usize,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// One program point
#[derive(Deserialize)]
pub struct Node {
    pub label: usize,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    pub stmt: Stmt,
}

/// A CFG edge, optionally tagged with the branch outcome it represents
#[derive(Deserialize)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    #[serde(default)]
    pub branch: Option<bool>,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Stmt {
    Assign { var: String, expr: Expr },
    Assume { cond: Expr },
    Eval { expr: Expr },
    Return {
        #[serde(default)]
        expr: Option<Expr>,
    },
    Skip,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Expr {
    Int {
        value: i64,
    },
    Float {
        value: f64,
    },
    Var {
        name: String,
    },
    Unary {
        op: String,
        arg: Box<Expr>,
    },
    Binary {
        op: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Unknown,
}
