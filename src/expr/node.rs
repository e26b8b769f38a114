#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Func {
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Sqrt,
    Abs,
    Tanh,
}

impl Func {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Func::Sin),
            "cos" => Some(Func::Cos),
            "tan" => Some(Func::Tan),
            "exp" => Some(Func::Exp),
            "ln" | "log" => Some(Func::Ln),
            "sqrt" => Some(Func::Sqrt),
            "abs" => Some(Func::Abs),
            "tanh" => Some(Func::Tanh),
            _ => None,
        }
    }

    fn apply(self, x: f64) -> f64 {
        match self {
            Func::Sin => x.sin(),
            Func::Cos => x.cos(),
            Func::Tan => x.tan(),
            Func::Exp => x.exp(),
            Func::Ln => x.ln(),
            Func::Sqrt => x.sqrt(),
            Func::Abs => x.abs(),
            Func::Tanh => x.tanh(),
        }
    }
}

/// Expression tree. State and parameter indices are 0-based.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Const(f64),
    State(usize),
    Param(usize),
    Time,
    Neg(Box<Node>),
    Binary(BinOp, Box<Node>, Box<Node>),
    Call(Func, Box<Node>),
}

impl Node {
    /// Walk the tree. Callers must have checked the indices against `u` and `p`.
    pub(crate) fn eval(&self, u: &[f64], p: &[f64], t: f64) -> f64 {
        match self {
            Node::Const(c) => *c,
            Node::State(i) => u[*i],
            Node::Param(i) => p[*i],
            Node::Time => t,
            Node::Neg(x) => -x.eval(u, p, t),
            Node::Binary(op, lhs, rhs) => {
                let a = lhs.eval(u, p, t);
                let b = rhs.eval(u, p, t);
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Pow => a.powf(b),
                }
            }
            Node::Call(func, x) => func.apply(x.eval(u, p, t)),
        }
    }

    /// Number of states and parameters the expression needs, i.e. one past the largest index used.
    pub(crate) fn extent(&self) -> (usize, usize) {
        match self {
            Node::Const(_) | Node::Time => (0, 0),
            Node::State(i) => (i + 1, 0),
            Node::Param(i) => (0, i + 1),
            Node::Neg(x) | Node::Call(_, x) => x.extent(),
            Node::Binary(_, lhs, rhs) => {
                let (su, sp) = lhs.extent();
                let (ru, rp) = rhs.extent();
                (su.max(ru), sp.max(rp))
            }
        }
    }
}
